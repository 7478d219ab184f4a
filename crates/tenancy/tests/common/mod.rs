//! Shared test harness for the tenancy crate.

#![allow(dead_code)]

pub mod driver;

use std::sync::Arc;

use serde_json::json;

use tessera_tenancy::pool::{ConnectionPoolManager, PoolSettings, Row};
use tessera_tenancy::tenant::{
    ConnectionDescriptor, InstallKind, PlaintextCredentials, RequestTenantContext,
    StaticTenantDirectory, TenantId, TenantIdentity, TenantStatus,
};

use driver::MemoryDriver;

/// Database name used for a tenant in these tests.
pub fn database_for(tenant: &str) -> String {
    format!("tenant_{tenant}")
}

/// Builds an active tenant identity.
pub fn identity(tenant: &str) -> TenantIdentity {
    identity_with_status(tenant, TenantStatus::Active)
}

/// Builds a tenant identity with the given status.
pub fn identity_with_status(tenant: &str, status: TenantStatus) -> TenantIdentity {
    identity_in_database(tenant, &database_for(tenant), status)
}

/// Builds a tenant identity pointing at an arbitrary database. Used to put
/// several tenants into one shared-schema database.
pub fn identity_in_database(tenant: &str, database: &str, status: TenantStatus) -> TenantIdentity {
    TenantIdentity::new(
        TenantId::new(tenant),
        tenant,
        ConnectionDescriptor {
            host: "db.test".to_string(),
            port: 5432,
            database: database.to_string(),
            user: format!("{tenant}_app"),
            encrypted_password: "dev".to_string(),
        },
        status,
        InstallKind::Shared,
    )
}

/// Builds a directory whose tenants all share one database.
pub fn shared_directory(tenants: &[&str], database: &str) -> Arc<StaticTenantDirectory> {
    let mut directory = StaticTenantDirectory::new();
    for tenant in tenants {
        directory = directory.with_tenant(identity_in_database(
            tenant,
            database,
            TenantStatus::Active,
        ));
    }
    Arc::new(directory)
}

/// Builds a pool manager whose tenants all share one database.
pub fn shared_manager(
    driver: Arc<MemoryDriver>,
    tenants: &[&str],
    database: &str,
    settings: PoolSettings,
) -> Arc<ConnectionPoolManager> {
    Arc::new(ConnectionPoolManager::new(
        driver,
        shared_directory(tenants, database),
        Arc::new(PlaintextCredentials),
        settings,
    ))
}

/// Builds a directory with the given active tenants.
pub fn directory(tenants: &[&str]) -> Arc<StaticTenantDirectory> {
    let mut directory = StaticTenantDirectory::new();
    for tenant in tenants {
        directory = directory.with_tenant(identity(tenant));
    }
    Arc::new(directory)
}

/// Builds a pool manager over the memory driver.
pub fn manager(
    driver: Arc<MemoryDriver>,
    tenants: &[&str],
    settings: PoolSettings,
) -> Arc<ConnectionPoolManager> {
    Arc::new(ConnectionPoolManager::new(
        driver,
        directory(tenants),
        Arc::new(PlaintextCredentials),
        settings,
    ))
}

/// Builds a request context for a tenant.
pub fn ctx(tenant: &str) -> RequestTenantContext {
    RequestTenantContext::new(TenantId::new(tenant))
}

/// Builds an employee row.
pub fn employee(badge: &str, name: &str) -> Row {
    let mut row = Row::new();
    row.insert("badge".to_string(), json!(badge));
    row.insert("name".to_string(), json!(name));
    row
}

/// Builds an employee row already stamped with a tenant id, for seeding
/// shared tables directly through the driver.
pub fn tenant_employee(tenant: &str, badge: &str, name: &str) -> Row {
    let mut row = employee(badge, name);
    row.insert("tenant_id".to_string(), json!(tenant));
    row
}
