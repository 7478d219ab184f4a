//! Tenant identity records.
//!
//! A [`TenantIdentity`] is the read-only directory record describing one
//! tenant: its subdomain, database connection descriptor, status, and
//! installation kind. Records are created and updated by an external
//! provisioning process; this subsystem only reads them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tenant::TenantId;

/// Lifecycle status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    /// The tenant is active and may be served.
    Active,
    /// The tenant is suspended; all requests are refused.
    Suspended,
}

/// How the tenant's data is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallKind {
    /// The tenant shares a database host with other tenants.
    Shared,
    /// The tenant has a dedicated database host.
    Dedicated,
}

/// Database connection descriptor for one tenant.
///
/// The password is stored encrypted and is only decrypted through a
/// [`CredentialCipher`] at pool-build time; the decrypted value never lives
/// on the identity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Database host.
    pub host: String,
    /// Database port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Database user for tenant-kind connections.
    pub user: String,
    /// Encrypted password, decrypted via [`CredentialCipher`].
    pub encrypted_password: String,
}

fn default_port() -> u16 {
    5432
}

/// A read-only directory record for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantIdentity {
    tenant_id: TenantId,
    subdomain: String,
    connection: ConnectionDescriptor,
    status: TenantStatus,
    install_kind: InstallKind,
}

impl TenantIdentity {
    /// Creates a new identity record.
    pub fn new(
        tenant_id: TenantId,
        subdomain: impl Into<String>,
        connection: ConnectionDescriptor,
        status: TenantStatus,
        install_kind: InstallKind,
    ) -> Self {
        Self {
            tenant_id,
            subdomain: subdomain.into(),
            connection,
            status,
            install_kind,
        }
    }

    /// Returns the tenant id.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the subdomain this tenant is served under.
    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    /// Returns the connection descriptor.
    pub fn connection(&self) -> &ConnectionDescriptor {
        &self.connection
    }

    /// Returns the tenant status.
    pub fn status(&self) -> TenantStatus {
        self.status
    }

    /// Returns the installation kind.
    pub fn install_kind(&self) -> InstallKind {
        self.install_kind
    }

    /// Returns `true` if the tenant may be served.
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Failure to decrypt a stored credential.
#[derive(Error, Debug)]
#[error("credential decryption failed: {0}")]
pub struct CredentialError(pub String);

/// Decrypts stored connection credentials.
///
/// Production deployments supply an implementation backed by the platform's
/// key management service. [`PlaintextCredentials`] is a passthrough for
/// development and tests.
pub trait CredentialCipher: Send + Sync {
    /// Decrypts an encrypted credential value.
    fn decrypt(&self, encrypted: &str) -> Result<String, CredentialError>;
}

/// Passthrough cipher for development mode: treats the stored value as
/// already plaintext.
#[derive(Debug, Default)]
pub struct PlaintextCredentials;

impl CredentialCipher for PlaintextCredentials {
    fn decrypt(&self, encrypted: &str) -> Result<String, CredentialError> {
        Ok(encrypted.to_string())
    }
}
