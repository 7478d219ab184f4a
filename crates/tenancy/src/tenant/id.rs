//! Tenant identifier type.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TenantError;

/// Pattern every tenant id must match: lowercase alphanumeric segments with
/// single interior hyphens, the same shape as a DNS label.
const TENANT_ID_PATTERN: &str = r"^[a-z0-9]([a-z0-9-]{0,62}[a-z0-9])?$";

fn tenant_id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TENANT_ID_PATTERN).expect("pattern is valid"))
}

/// An opaque tenant identifier.
///
/// Tenant ids double as subdomain labels, so they are restricted to the DNS
/// label shape (lowercase alphanumerics and interior hyphens, at most 64
/// characters). Use [`TenantId::parse`] when the value comes from an
/// untrusted source; [`TenantId::new`] is for values already known to be
/// well-formed (directory records, test fixtures).
///
/// # Examples
///
/// ```
/// use tessera_tenancy::tenant::TenantId;
///
/// let tenant = TenantId::parse("acme-corp").unwrap();
/// assert_eq!(tenant.as_str(), "acme-corp");
/// assert!(TenantId::parse("Not A Subdomain").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant id from a trusted string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses and validates a tenant id from an untrusted string.
    ///
    /// # Errors
    ///
    /// Returns [`TenantError::InvalidId`] if the value does not match the
    /// required DNS-label shape.
    pub fn parse(value: &str) -> Result<Self, TenantError> {
        if tenant_id_regex().is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(TenantError::InvalidId {
                value: value.to_string(),
                reason: format!("must match {}", TENANT_ID_PATTERN),
            })
        }
    }

    /// Returns the tenant id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl FromStr for TenantId {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TenantId::parse(s)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        TenantId::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
