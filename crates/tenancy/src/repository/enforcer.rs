//! Mandatory tenant filter enforcement.
//!
//! The enforcer guarantees that every statement against a tenant-scoped
//! table carries a bound-parameter tenant predicate before it reaches a
//! connection. It is stateless per call and fails closed: a tenant-scoped
//! operation with no explicit tenant id and no request context is refused
//! before any statement is built.
//!
//! Two separately named paths exist on purpose and must never be merged:
//!
//! - [`TenantFilterEnforcer::scoped`] - the fail-closed default for all
//!   request-serving code.
//! - [`TenantFilterEnforcer::bypassed`] - the maintenance escape hatch,
//!   usable only when the global policy flag is enabled AND the call passes
//!   the explicit [`FilterBypass`] opt-in. Every use is logged as a
//!   security event.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FilterError;
use crate::pool::Row;
use crate::tenant::{RequestTenantContext, TenantId};

/// Whether a table carries tenant-partitioned data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    /// Rows are partitioned by a tenant column; every statement gets a
    /// tenant predicate.
    TenantScoped {
        /// The tenant discriminator column.
        tenant_column: &'static str,
    },
    /// Shared reference data with no tenant column; exempt from filtering.
    Global,
}

/// Static description of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Table name.
    pub name: &'static str,
    /// Tenant scoping for this table.
    pub scope: TableScope,
}

impl TableSpec {
    /// Describes a tenant-scoped table.
    pub const fn tenant_scoped(name: &'static str, tenant_column: &'static str) -> Self {
        Self {
            name,
            scope: TableScope::TenantScoped { tenant_column },
        }
    }

    /// Describes a global (shared) table.
    pub const fn global(name: &'static str) -> Self {
        Self {
            name,
            scope: TableScope::Global,
        }
    }
}

/// A statement with its bound parameters.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    /// SQL text with positional placeholders.
    pub sql: String,
    /// Parameter values, in placeholder order.
    pub params: Vec<Value>,
}

/// Builds statements with positional placeholders and bound parameters.
///
/// Values never enter the SQL text; each filter or change adds a `$n`
/// placeholder and pushes the value into the parameter list.
#[derive(Debug)]
pub struct StatementBuilder {
    sql: String,
    params: Vec<Value>,
    has_where: bool,
}

impl StatementBuilder {
    /// Starts a `SELECT *` statement for the table.
    pub fn select(table: &TableSpec) -> Self {
        Self {
            sql: format!("SELECT * FROM {}", table.name),
            params: Vec::new(),
            has_where: false,
        }
    }

    /// Starts an `UPDATE` statement applying the given changes.
    pub fn update(table: &TableSpec, changes: Row) -> Self {
        let mut params = Vec::with_capacity(changes.len());
        let mut assignments = Vec::with_capacity(changes.len());
        for (column, value) in changes {
            params.push(value);
            assignments.push(format!("{} = ${}", column, params.len()));
        }
        Self {
            sql: format!("UPDATE {} SET {}", table.name, assignments.join(", ")),
            params,
            has_where: false,
        }
    }

    /// Starts a `DELETE` statement for the table.
    pub fn delete(table: &TableSpec) -> Self {
        Self {
            sql: format!("DELETE FROM {}", table.name),
            params: Vec::new(),
            has_where: false,
        }
    }

    /// Adds an equality filter as a bound parameter.
    pub fn filter(mut self, column: &str, value: Value) -> Self {
        self.params.push(value);
        let clause = format!("{} = ${}", column, self.params.len());
        self.push_clause(&clause);
        self
    }

    fn push_clause(&mut self, clause: &str) {
        if self.has_where {
            self.sql.push_str(" AND ");
        } else {
            self.sql.push_str(" WHERE ");
            self.has_where = true;
        }
        self.sql.push_str(clause);
    }

    /// Finishes the statement without further predicates.
    pub fn build(self) -> BoundStatement {
        BoundStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Global enforcement policy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterPolicy {
    /// When false, every bypass request fails with a distinct "bypass
    /// disabled" error.
    #[serde(default)]
    pub allow_bypass: bool,
}

/// Explicit per-call opt-in marker for the unfiltered bypass path.
///
/// Making the opt-in a value that must be constructed and passed keeps
/// every bypass call site visible in review; there is no way to reach the
/// unfiltered path by omitting an argument.
#[derive(Debug, Clone, Copy)]
pub struct FilterBypass;

/// Enforces the mandatory tenant predicate on tenant-scoped statements.
#[derive(Debug, Default)]
pub struct TenantFilterEnforcer {
    policy: FilterPolicy,
}

impl TenantFilterEnforcer {
    /// Creates an enforcer with the given policy.
    pub fn new(policy: FilterPolicy) -> Self {
        Self { policy }
    }

    /// Resolves the effective tenant id for an operation: the explicit id
    /// if given, else the request context's, else a fail-closed error.
    pub fn resolve_tenant(
        &self,
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
        operation: &str,
    ) -> Result<TenantId, FilterError> {
        explicit
            .cloned()
            .or_else(|| ctx.map(|c| c.tenant_id().clone()))
            .ok_or_else(|| FilterError::ContextRequired {
                operation: operation.to_string(),
            })
    }

    /// Applies the tenant predicate to a statement for the given table.
    ///
    /// Global tables pass through untouched. For tenant-scoped tables the
    /// predicate is appended as a bound parameter; the tenant id comes from
    /// the explicit argument or the request context, failing closed if
    /// neither is present.
    pub fn scoped(
        &self,
        table: &TableSpec,
        builder: StatementBuilder,
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
    ) -> Result<BoundStatement, FilterError> {
        match table.scope {
            TableScope::Global => Ok(builder.build()),
            TableScope::TenantScoped { tenant_column } => {
                let tenant = self.resolve_tenant(explicit, ctx, table.name)?;
                debug!(table = table.name, tenant_id = %tenant, "applying tenant filter");
                Ok(builder
                    .filter(tenant_column, Value::String(tenant.as_str().to_string()))
                    .build())
            }
        }
    }

    /// Builds a tenant-stamped `INSERT` for the table.
    ///
    /// Client-supplied tenant values never reach the statement: any value
    /// already present under the tenant column is discarded in favor of the
    /// resolved tenant id.
    pub fn scoped_insert(
        &self,
        table: &TableSpec,
        mut row: Row,
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
    ) -> Result<BoundStatement, FilterError> {
        if let TableScope::TenantScoped { tenant_column } = table.scope {
            let tenant = self.resolve_tenant(explicit, ctx, table.name)?;
            if row.remove(tenant_column).is_some() {
                debug!(
                    table = table.name,
                    "discarded caller-supplied tenant column on insert"
                );
            }
            row.insert(
                tenant_column.to_string(),
                Value::String(tenant.as_str().to_string()),
            );
        }

        let mut columns = Vec::with_capacity(row.len());
        let mut placeholders = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (column, value) in row {
            params.push(value);
            placeholders.push(format!("${}", params.len()));
            columns.push(column);
        }
        Ok(BoundStatement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table.name,
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        })
    }

    /// The maintenance escape hatch: returns the statement without a tenant
    /// predicate.
    ///
    /// Requires the global policy flag AND the explicit per-call opt-in;
    /// every use is logged as a security event. With the flag disabled the
    /// call fails with [`FilterError::BypassDisabled`] - it never silently
    /// scopes and never silently bypasses.
    pub fn bypassed(
        &self,
        table: &TableSpec,
        builder: StatementBuilder,
        _bypass: FilterBypass,
    ) -> Result<BoundStatement, FilterError> {
        if !self.policy.allow_bypass {
            return Err(FilterError::BypassDisabled {
                operation: table.name.to_string(),
            });
        }
        warn!(
            security = true,
            table = table.name,
            "tenant filter bypass used"
        );
        Ok(builder.build())
    }
}
