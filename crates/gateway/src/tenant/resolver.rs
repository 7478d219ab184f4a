//! Host-based tenant resolution.
//!
//! The Host header is the only authoritative tenant signal. In production
//! mode a missing or ambiguous Host fails the request immediately with no
//! fallback. In development mode, where the Host is typically a loopback or
//! placeholder value, the Origin header may be consulted instead - but any
//! subdomain it yields is independently re-validated against the tenant
//! directory before being trusted, and an unverifiable Origin is discarded
//! in favor of the configured development default tenant.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use tessera_tenancy::tenant::{TenantDirectory, TenantId, TenantIdentity};

use crate::config::DeploymentMode;

use super::source::ResolutionSource;

/// Host values that can never identify a tenant.
const PLACEHOLDER_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1", "testserver"];

/// Errors raised while resolving the request tenant.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No usable Host header in a production-mode request. Indicates a
    /// proxy/deployment misconfiguration, never a caller mistake.
    #[error("no usable Host header on request")]
    MissingHost,

    /// The Host header does not yield exactly one subdomain under the
    /// configured base domain.
    #[error("ambiguous request host: {host}")]
    AmbiguousHost { host: String },

    /// No tenant is registered for the extracted subdomain.
    #[error("unknown tenant subdomain: {subdomain}")]
    UnknownTenant { subdomain: String },

    /// The tenant exists but is suspended.
    #[error("tenant suspended: {subdomain}")]
    TenantSuspended { subdomain: String },
}

/// Result of resolving the tenant for one request.
#[derive(Debug, Clone)]
pub struct ResolvedTenant {
    /// The tenant's directory record.
    pub identity: TenantIdentity,
    /// Which signal produced the resolution.
    pub source: ResolutionSource,
}

impl ResolvedTenant {
    /// Returns the resolved tenant id.
    pub fn tenant_id(&self) -> &TenantId {
        self.identity.tenant_id()
    }
}

/// Settings controlling Host/Origin trust.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// The deployment mode; controls whether the Origin fallback exists.
    pub mode: DeploymentMode,
    /// The platform's base domain; when set, the subdomain is whatever
    /// precedes `.{base_domain}` in the Host. Required in production.
    pub base_domain: Option<String>,
    /// Development-mode default tenant subdomain used when neither Host
    /// nor Origin resolves.
    pub dev_default_subdomain: Option<String>,
}

/// Resolves the request tenant from the Host header.
pub struct HostTenantResolver {
    settings: ResolverSettings,
    directory: Arc<dyn TenantDirectory>,
}

impl HostTenantResolver {
    /// Creates a resolver over the given directory.
    pub fn new(settings: ResolverSettings, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            settings,
            directory,
        }
    }

    /// Resolves the tenant for a request.
    ///
    /// `authority` is the URI authority, used when the Host header is
    /// absent (HTTP/2 requests carry the host in `:authority`).
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        authority: Option<&str>,
    ) -> Result<ResolvedTenant, ResolveError> {
        let production = self.settings.mode == DeploymentMode::Production;

        let host = headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| authority.map(str::to_string));

        let host = match host {
            Some(host) => host,
            None if production => return Err(ResolveError::MissingHost),
            None => return self.development_fallback(headers).await,
        };

        let host = normalize_host(&host);
        if is_placeholder_host(&host) {
            if production {
                return Err(ResolveError::AmbiguousHost { host });
            }
            return self.development_fallback(headers).await;
        }

        match self.subdomain_of(&host) {
            Some(subdomain) => self.lookup(&subdomain, ResolutionSource::Host).await,
            None if production => Err(ResolveError::AmbiguousHost { host }),
            None => self.development_fallback(headers).await,
        }
    }

    /// Development-mode fallback chain: re-validated Origin, then the
    /// configured default tenant.
    async fn development_fallback(
        &self,
        headers: &HeaderMap,
    ) -> Result<ResolvedTenant, ResolveError> {
        if let Some(subdomain) = self.subdomain_from_origin(headers) {
            // The Origin is client-supplied: trust it only after the
            // directory confirms an active tenant behind it.
            if let Some(identity) = self.directory.lookup_by_subdomain(&subdomain).await {
                if identity.is_active() {
                    debug!(subdomain, "tenant resolved from re-validated Origin header");
                    return Ok(ResolvedTenant {
                        identity,
                        source: ResolutionSource::OriginFallback,
                    });
                }
            }
            warn!(subdomain, "unverifiable Origin subdomain discarded");
        }

        match &self.settings.dev_default_subdomain {
            Some(subdomain) => {
                self.lookup(subdomain, ResolutionSource::DevelopmentDefault)
                    .await
            }
            None => Err(ResolveError::MissingHost),
        }
    }

    async fn lookup(
        &self,
        subdomain: &str,
        source: ResolutionSource,
    ) -> Result<ResolvedTenant, ResolveError> {
        let identity = self
            .directory
            .lookup_by_subdomain(subdomain)
            .await
            .ok_or_else(|| ResolveError::UnknownTenant {
                subdomain: subdomain.to_string(),
            })?;
        if !identity.is_active() {
            return Err(ResolveError::TenantSuspended {
                subdomain: subdomain.to_string(),
            });
        }
        Ok(ResolvedTenant { identity, source })
    }

    /// Extracts the tenant subdomain from a normalized host.
    fn subdomain_of(&self, host: &str) -> Option<String> {
        let candidate = match &self.settings.base_domain {
            Some(base) => host.strip_suffix(base.as_str())?.strip_suffix('.')?,
            // Without a configured base domain (development), the first
            // label is the subdomain as long as there is more than one.
            None => {
                let (first, rest) = host.split_once('.')?;
                if rest.is_empty() {
                    return None;
                }
                first
            }
        };
        if candidate.is_empty() || candidate.contains('.') {
            return None;
        }
        TenantId::parse(candidate).ok()?;
        Some(candidate.to_string())
    }

    fn subdomain_from_origin(&self, headers: &HeaderMap) -> Option<String> {
        let origin = headers.get(header::ORIGIN)?.to_str().ok()?;
        let url = Url::parse(origin).ok()?;
        let host = normalize_host(url.host_str()?);
        if is_placeholder_host(&host) {
            return None;
        }
        self.subdomain_of(&host)
    }
}

/// Lowercases a host value and strips any port suffix.
fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    // Bracketed IPv6 literals keep their colons.
    if let Some(stripped) = host.strip_prefix('[') {
        return stripped
            .split_once(']')
            .map(|(addr, _)| addr.to_string())
            .unwrap_or(host);
    }
    match host.split_once(':') {
        Some((name, _port)) => name.to_string(),
        None => host,
    }
}

fn is_placeholder_host(host: &str) -> bool {
    PLACEHOLDER_HOSTS.contains(&host)
}
