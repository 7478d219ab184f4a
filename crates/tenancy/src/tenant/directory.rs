//! Tenant directory lookup.
//!
//! The directory is an external collaborator: it owns the authoritative
//! subdomain → tenant mapping maintained by the provisioning process. This
//! module defines the lookup seam and a static in-memory implementation for
//! development and tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::tenant::{TenantId, TenantIdentity};

/// Lookup interface for tenant identity records.
///
/// There is exactly one identity per subdomain at any time; the directory
/// implementation is responsible for that invariant.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Looks up a tenant by its subdomain.
    async fn lookup_by_subdomain(&self, subdomain: &str) -> Option<TenantIdentity>;

    /// Looks up a tenant by its id.
    async fn lookup_by_id(&self, tenant_id: &TenantId) -> Option<TenantIdentity>;
}

/// Static in-memory tenant directory.
///
/// Intended for development mode and tests; production deployments back the
/// directory with the platform's tenant registry service.
///
/// # Examples
///
/// ```
/// use tessera_tenancy::tenant::{
///     ConnectionDescriptor, InstallKind, StaticTenantDirectory, TenantId, TenantIdentity,
///     TenantStatus,
/// };
///
/// let directory = StaticTenantDirectory::new().with_tenant(TenantIdentity::new(
///     TenantId::new("acme"),
///     "acme",
///     ConnectionDescriptor {
///         host: "localhost".into(),
///         port: 5432,
///         database: "tenant_acme".into(),
///         user: "acme_app".into(),
///         encrypted_password: "dev".into(),
///     },
///     TenantStatus::Active,
///     InstallKind::Shared,
/// ));
/// ```
#[derive(Debug, Default)]
pub struct StaticTenantDirectory {
    by_subdomain: HashMap<String, TenantIdentity>,
}

impl StaticTenantDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tenant record, replacing any existing record for the same
    /// subdomain.
    pub fn with_tenant(mut self, identity: TenantIdentity) -> Self {
        self.by_subdomain
            .insert(identity.subdomain().to_string(), identity);
        self
    }

    /// Returns the number of registered tenants.
    pub fn len(&self) -> usize {
        self.by_subdomain.len()
    }

    /// Returns `true` if no tenants are registered.
    pub fn is_empty(&self) -> bool {
        self.by_subdomain.is_empty()
    }
}

#[async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn lookup_by_subdomain(&self, subdomain: &str) -> Option<TenantIdentity> {
        self.by_subdomain.get(subdomain).cloned()
    }

    async fn lookup_by_id(&self, tenant_id: &TenantId) -> Option<TenantIdentity> {
        self.by_subdomain
            .values()
            .find(|identity| identity.tenant_id() == tenant_id)
            .cloned()
    }
}
