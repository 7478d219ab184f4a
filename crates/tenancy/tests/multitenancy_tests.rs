//! Tenant isolation tests.
//!
//! Two tenants share one database and one table; every read must stay
//! inside the caller's tenant, with colliding natural keys across tenants
//! never leaking.

mod common;

use serde_json::json;

use tessera_tenancy::error::{FilterError, IsolationError};
use tessera_tenancy::pool::{ConnectionKind, PoolSettings};
use tessera_tenancy::repository::{
    FilterBypass, FilterPolicy, Repository, TableSpec, TenantFilterEnforcer,
};
use tessera_tenancy::tenant::TenantId;

use common::driver::MemoryDriver;

const EMPLOYEES: TableSpec = TableSpec::tenant_scoped("employees", "tenant_id");
const COUNTRIES: TableSpec = TableSpec::global("countries");
const SHARED_DB: &str = "core";

fn seed_colliding_badges(driver: &MemoryDriver) {
    // Same natural key ("E-1001") in both tenants.
    driver.seed(
        SHARED_DB,
        "employees",
        vec![
            common::tenant_employee("acme", "E-1001", "Acme Employee"),
            common::tenant_employee("globex", "E-1001", "Globex Employee"),
        ],
    );
}

#[tokio::test]
async fn test_reads_never_cross_tenants() {
    let driver = MemoryDriver::new();
    seed_colliding_badges(&driver);
    let manager = common::shared_manager(
        driver.clone(),
        &["acme", "globex"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::default();
    let employees = Repository::new(&enforcer, EMPLOYEES);

    let ctx_acme = common::ctx("acme");
    let mut conn = manager
        .acquire_for_context(&ctx_acme, ConnectionKind::Tenant)
        .await
        .unwrap();
    let rows = employees
        .find(&mut conn, &[("badge", json!("E-1001"))], None, Some(&ctx_acme))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Acme Employee"));
}

#[tokio::test]
async fn test_concurrent_requests_stay_isolated() {
    let driver = MemoryDriver::new();
    seed_colliding_badges(&driver);
    let manager = common::shared_manager(
        driver.clone(),
        &["acme", "globex"],
        SHARED_DB,
        PoolSettings::default(),
    );

    let mut handles = Vec::new();
    for (tenant, expected) in [("acme", "Acme Employee"), ("globex", "Globex Employee")] {
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move {
                let enforcer = TenantFilterEnforcer::default();
                let employees = Repository::new(&enforcer, EMPLOYEES);
                let ctx = common::ctx(tenant);
                let mut conn = manager
                    .acquire_for_context(&ctx, ConnectionKind::Tenant)
                    .await
                    .unwrap();
                let rows = employees
                    .find(&mut conn, &[("badge", json!("E-1001"))], None, Some(&ctx))
                    .await
                    .unwrap();
                assert_eq!(rows.len(), 1, "read crossed tenants for {tenant}");
                assert_eq!(rows[0]["name"], json!(expected));
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_writes_are_stamped_with_tenant() {
    let driver = MemoryDriver::new();
    let manager = common::shared_manager(
        driver.clone(),
        &["acme", "globex"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::default();
    let employees = Repository::new(&enforcer, EMPLOYEES);

    let ctx_acme = common::ctx("acme");
    let mut conn = manager
        .acquire_for_context(&ctx_acme, ConnectionKind::Tenant)
        .await
        .unwrap();
    employees
        .insert(
            &mut conn,
            common::employee("E-2000", "New Hire"),
            None,
            Some(&ctx_acme),
        )
        .await
        .unwrap();

    // The other tenant cannot see the new row.
    let ctx_globex = common::ctx("globex");
    let mut conn = manager
        .acquire_for_context(&ctx_globex, ConnectionKind::Tenant)
        .await
        .unwrap();
    let rows = employees
        .find(&mut conn, &[("badge", json!("E-2000"))], None, Some(&ctx_globex))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_update_and_delete_stay_scoped() {
    let driver = MemoryDriver::new();
    seed_colliding_badges(&driver);
    let manager = common::shared_manager(
        driver.clone(),
        &["acme", "globex"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::default();
    let employees = Repository::new(&enforcer, EMPLOYEES);

    let ctx_acme = common::ctx("acme");
    let mut conn = manager
        .acquire_for_context(&ctx_acme, ConnectionKind::Tenant)
        .await
        .unwrap();

    let mut changes = tessera_tenancy::pool::Row::new();
    changes.insert("name".to_string(), json!("Renamed"));
    let affected = employees
        .update(
            &mut conn,
            changes,
            &[("badge", json!("E-1001"))],
            None,
            Some(&ctx_acme),
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let affected = employees
        .delete(&mut conn, &[("badge", json!("E-1001"))], None, Some(&ctx_acme))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    // Globex's colliding row is untouched by both operations.
    let remaining = driver.rows(SHARED_DB, "employees");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["tenant_id"], json!("globex"));
    assert_eq!(remaining[0]["name"], json!("Globex Employee"));
}

#[tokio::test]
async fn test_default_deny_without_context() {
    let driver = MemoryDriver::new();
    seed_colliding_badges(&driver);
    let manager = common::shared_manager(
        driver.clone(),
        &["acme"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::default();
    let employees = Repository::new(&enforcer, EMPLOYEES);

    let ctx = common::ctx("acme");
    let mut conn = manager
        .acquire_for_context(&ctx, ConnectionKind::Tenant)
        .await
        .unwrap();
    let statements_before = driver.statement_count();

    // No explicit tenant and no context: refused before any statement.
    let result = employees.find(&mut conn, &[], None, None).await;
    assert!(matches!(
        result,
        Err(IsolationError::Filter(FilterError::ContextRequired { .. }))
    ));
    assert_eq!(driver.statement_count(), statements_before);
}

#[tokio::test]
async fn test_explicit_tenant_without_context() {
    let driver = MemoryDriver::new();
    seed_colliding_badges(&driver);
    let manager = common::shared_manager(
        driver.clone(),
        &["globex"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::default();
    let employees = Repository::new(&enforcer, EMPLOYEES);

    // Background jobs pass an explicit tenant id instead of a context.
    let globex = TenantId::new("globex");
    let mut conn = manager
        .acquire(&globex, ConnectionKind::Tenant)
        .await
        .unwrap();
    let rows = employees
        .find(&mut conn, &[], Some(&globex), None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Globex Employee"));
}

#[tokio::test]
async fn test_bypass_disabled_fails_distinctly() {
    let driver = MemoryDriver::new();
    seed_colliding_badges(&driver);
    let manager = common::shared_manager(
        driver.clone(),
        &["acme"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::new(FilterPolicy {
        allow_bypass: false,
    });
    let employees = Repository::new(&enforcer, EMPLOYEES);

    let ctx = common::ctx("acme");
    let mut conn = manager
        .acquire_for_context(&ctx, ConnectionKind::Tenant)
        .await
        .unwrap();
    let result = employees
        .find_unfiltered(&mut conn, &[], FilterBypass)
        .await;

    // Distinct error: neither silently scoped nor silently bypassed.
    assert!(matches!(
        result,
        Err(IsolationError::Filter(FilterError::BypassDisabled { .. }))
    ));
}

#[tokio::test]
async fn test_bypass_enabled_returns_all_tenants() {
    let driver = MemoryDriver::new();
    seed_colliding_badges(&driver);
    let manager = common::shared_manager(
        driver.clone(),
        &["acme"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::new(FilterPolicy { allow_bypass: true });
    let employees = Repository::new(&enforcer, EMPLOYEES);

    let ctx = common::ctx("acme");
    let mut conn = manager
        .acquire_for_context(&ctx, ConnectionKind::Tenant)
        .await
        .unwrap();
    let rows = employees
        .find_unfiltered(&mut conn, &[("badge", json!("E-1001"))], FilterBypass)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_global_table_needs_no_tenant() {
    let driver = MemoryDriver::new();
    let mut row = tessera_tenancy::pool::Row::new();
    row.insert("code".to_string(), json!("NL"));
    driver.seed(SHARED_DB, "countries", vec![row]);
    let manager = common::shared_manager(
        driver.clone(),
        &["acme"],
        SHARED_DB,
        PoolSettings::default(),
    );
    let enforcer = TenantFilterEnforcer::default();
    let countries = Repository::new(&enforcer, COUNTRIES);

    let acme = TenantId::new("acme");
    let mut conn = manager.acquire(&acme, ConnectionKind::Tenant).await.unwrap();
    // No explicit tenant, no context: global tables are exempt.
    let rows = countries.find(&mut conn, &[], None, None).await.unwrap();
    assert_eq!(rows.len(), 1);
}
