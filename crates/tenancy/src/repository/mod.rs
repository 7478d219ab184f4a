//! Tenant-scoped data access.
//!
//! Every read/write against a tenant-scoped table goes through the
//! [`TenantFilterEnforcer`], which guarantees a bound-parameter tenant
//! predicate on the statement. [`Repository`] is the thin base used by the
//! platform's business modules: it builds the statement, routes it through
//! the enforcer, and executes it on a [`ScopedConnection`].

mod enforcer;

pub use enforcer::{
    BoundStatement, FilterBypass, FilterPolicy, StatementBuilder, TableScope, TableSpec,
    TenantFilterEnforcer,
};

use serde_json::Value;

use crate::error::{DatabaseError, IsolationResult};
use crate::pool::{Row, ScopedConnection};
use crate::tenant::{RequestTenantContext, TenantId};

/// Tenant-scoped repository base for one table.
///
/// Stateless per call: the tenant id comes from the explicit argument or
/// the request context handed to each operation, never from stored state.
///
/// # Examples
///
/// ```ignore
/// let employees = Repository::new(&enforcer, TableSpec::tenant_scoped("employees", "tenant_id"));
/// let rows = employees
///     .find(&mut conn, &[("badge", json!("E-1001"))], None, Some(&ctx))
///     .await?;
/// ```
pub struct Repository<'a> {
    enforcer: &'a TenantFilterEnforcer,
    table: TableSpec,
}

impl<'a> Repository<'a> {
    /// Creates a repository for the given table.
    pub fn new(enforcer: &'a TenantFilterEnforcer, table: TableSpec) -> Self {
        Self { enforcer, table }
    }

    /// Returns the table this repository serves.
    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    /// Reads rows matching the given equality filters, scoped to the
    /// resolved tenant.
    pub async fn find(
        &self,
        conn: &mut ScopedConnection,
        filters: &[(&str, Value)],
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
    ) -> IsolationResult<Vec<Row>> {
        let mut builder = StatementBuilder::select(&self.table);
        for (column, value) in filters {
            builder = builder.filter(column, value.clone());
        }
        let statement = self.enforcer.scoped(&self.table, builder, explicit, ctx)?;
        let rows = conn
            .query(&statement.sql, &statement.params)
            .await
            .map_err(|err| DatabaseError::from_driver("query failed", err))?;
        Ok(rows)
    }

    /// Reads rows across all tenants. Separate, explicitly-named escape
    /// hatch for maintenance work; gated on the global bypass flag plus the
    /// per-call [`FilterBypass`] opt-in.
    pub async fn find_unfiltered(
        &self,
        conn: &mut ScopedConnection,
        filters: &[(&str, Value)],
        bypass: FilterBypass,
    ) -> IsolationResult<Vec<Row>> {
        let mut builder = StatementBuilder::select(&self.table);
        for (column, value) in filters {
            builder = builder.filter(column, value.clone());
        }
        let statement = self.enforcer.bypassed(&self.table, builder, bypass)?;
        let rows = conn
            .query(&statement.sql, &statement.params)
            .await
            .map_err(|err| DatabaseError::from_driver("query failed", err))?;
        Ok(rows)
    }

    /// Inserts one row, stamped with the resolved tenant id.
    ///
    /// Any tenant column present in the row is discarded; the resolved
    /// tenant is authoritative.
    pub async fn insert(
        &self,
        conn: &mut ScopedConnection,
        row: Row,
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
    ) -> IsolationResult<u64> {
        let statement = self
            .enforcer
            .scoped_insert(&self.table, row, explicit, ctx)?;
        let affected = conn
            .execute(&statement.sql, &statement.params)
            .await
            .map_err(|err| DatabaseError::from_driver("insert failed", err))?;
        Ok(affected)
    }

    /// Updates rows matching the filters, scoped to the resolved tenant.
    pub async fn update(
        &self,
        conn: &mut ScopedConnection,
        changes: Row,
        filters: &[(&str, Value)],
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
    ) -> IsolationResult<u64> {
        let mut builder = StatementBuilder::update(&self.table, changes);
        for (column, value) in filters {
            builder = builder.filter(column, value.clone());
        }
        let statement = self.enforcer.scoped(&self.table, builder, explicit, ctx)?;
        let affected = conn
            .execute(&statement.sql, &statement.params)
            .await
            .map_err(|err| DatabaseError::from_driver("update failed", err))?;
        Ok(affected)
    }

    /// Deletes rows matching the filters, scoped to the resolved tenant.
    pub async fn delete(
        &self,
        conn: &mut ScopedConnection,
        filters: &[(&str, Value)],
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
    ) -> IsolationResult<u64> {
        let mut builder = StatementBuilder::delete(&self.table);
        for (column, value) in filters {
            builder = builder.filter(column, value.clone());
        }
        let statement = self.enforcer.scoped(&self.table, builder, explicit, ctx)?;
        let affected = conn
            .execute(&statement.sql, &statement.params)
            .await
            .map_err(|err| DatabaseError::from_driver("delete failed", err))?;
        Ok(affected)
    }
}
