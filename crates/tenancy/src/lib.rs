//! Tessera Tenant Isolation Layer
//!
//! This crate provides the tenant isolation and connection-management core
//! of the Tessera platform: hundreds of tenants share one deployment but
//! must never observe each other's data.
//!
//! # Architecture
//!
//! - [`tenant`] - Tenant identity, the request-scoped tenant context, and
//!   the directory lookup seam
//! - [`pool`] - Bounded, evictable per-tenant connection pools over a
//!   black-box database driver
//! - [`repository`] - Mandatory tenant filter enforcement for all
//!   tenant-scoped data access
//! - [`uow`] - Unit-of-work transaction scopes (one connection, one atomic
//!   outcome)
//! - [`audit`] - Cross-tenant access audit events
//! - [`error`] - Error types for all operations
//!
//! # Isolation Model
//!
//! Every tenant-scoped operation requires a tenant id, either explicit or
//! from the [`RequestTenantContext`](tenant::RequestTenantContext) created
//! at request entry. When neither is present the operation fails closed
//! before any statement is built. The only way around the filter is the
//! separately named maintenance bypass, gated on a global policy flag plus
//! an explicit per-call opt-in, and logged as a security event on every
//! use.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tessera_tenancy::pool::{ConnectionKind, ConnectionPoolManager, PoolSettings};
//! use tessera_tenancy::repository::{FilterPolicy, Repository, TableSpec, TenantFilterEnforcer};
//! use tessera_tenancy::tenant::{
//!     PlaintextCredentials, RequestTenantContext, StaticTenantDirectory, TenantId,
//! };
//!
//! # async fn example(driver: Arc<dyn tessera_tenancy::pool::DatabaseDriver>) -> tessera_tenancy::error::IsolationResult<()> {
//! let directory = Arc::new(StaticTenantDirectory::new());
//! let manager = ConnectionPoolManager::new(
//!     driver,
//!     directory,
//!     Arc::new(PlaintextCredentials),
//!     PoolSettings::default(),
//! );
//!
//! let ctx = RequestTenantContext::new(TenantId::new("acme"));
//! let mut conn = manager.acquire_for_context(&ctx, ConnectionKind::Tenant).await?;
//!
//! let enforcer = TenantFilterEnforcer::new(FilterPolicy::default());
//! let employees = Repository::new(&enforcer, TableSpec::tenant_scoped("employees", "tenant_id"));
//! let rows = employees.find(&mut conn, &[], None, Some(&ctx)).await?;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod error;
pub mod pool;
pub mod repository;
pub mod tenant;
pub mod uow;

pub use error::{IsolationError, IsolationResult};
