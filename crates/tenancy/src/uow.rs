//! Unit of work: one connection, one atomic outcome.
//!
//! A [`UnitOfWork`] binds a sequence of statements to a single borrowed
//! connection and guarantees exactly one terminal outcome: committed or
//! rolled back. Statements execute strictly in call order. Sessions do not
//! nest and are not reentrant.
//!
//! The held connection is returned to its pool on every exit path: commit,
//! rollback, error, or drop (including task cancellation). A session
//! dropped while still active is rolled back when the pool recycles its
//! connection.

use serde_json::Value;

use crate::error::{DatabaseError, IsolationResult, SessionError};
use crate::pool::{ConnectionKind, ConnectionPoolManager, Row, ScopedConnection};
use crate::repository::TenantFilterEnforcer;
use crate::tenant::{RequestTenantContext, TenantId};

/// Lifecycle of a unit-of-work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Inside the scope; statements may execute.
    Active,
    /// Terminal: all statements persisted.
    Committed,
    /// Terminal: no statement's effects persisted.
    RolledBack,
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOutcome::Active => write!(f, "active"),
            SessionOutcome::Committed => write!(f, "committed"),
            SessionOutcome::RolledBack => write!(f, "rolled-back"),
        }
    }
}

/// One statement to run inside a unit of work.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
    kind: StatementKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementKind {
    Read,
    Write,
}

impl Statement {
    /// A read statement; executing it yields rows.
    pub fn read(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind: StatementKind::Read,
        }
    }

    /// A write statement; executing it yields an affected-row count.
    pub fn write(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind: StatementKind::Write,
        }
    }
}

/// Result of executing one statement.
#[derive(Debug, Clone)]
pub enum StatementOutcome {
    /// Rows returned by a read.
    Rows(Vec<Row>),
    /// Affected-row count returned by a write.
    Affected(u64),
}

impl StatementOutcome {
    /// Returns the rows, if this was a read.
    pub fn rows(self) -> Option<Vec<Row>> {
        match self {
            StatementOutcome::Rows(rows) => Some(rows),
            StatementOutcome::Affected(_) => None,
        }
    }

    /// Returns the affected count, if this was a write.
    pub fn affected(&self) -> Option<u64> {
        match self {
            StatementOutcome::Rows(_) => None,
            StatementOutcome::Affected(n) => Some(*n),
        }
    }
}

/// A transaction scope over one tenant connection.
///
/// # Examples
///
/// ```ignore
/// let mut uow = UnitOfWork::begin(&manager, &enforcer, None, Some(&ctx)).await?;
/// uow.execute(Statement::write(
///     "UPDATE accounts SET balance = $1 WHERE id = $2 AND tenant_id = $3",
///     vec![json!(90), json!("a"), json!("acme")],
/// ))
/// .await?;
/// uow.commit().await?;
/// ```
pub struct UnitOfWork {
    tenant_id: TenantId,
    conn: ScopedConnection,
    op_count: u32,
    outcome: SessionOutcome,
}

impl UnitOfWork {
    /// Opens a unit of work for the resolved tenant.
    ///
    /// Resolves the tenant id (explicit or from the request context,
    /// failing closed if neither is present), acquires one connection from
    /// the pool manager, and begins a transaction on it.
    pub async fn begin(
        manager: &ConnectionPoolManager,
        enforcer: &TenantFilterEnforcer,
        explicit: Option<&TenantId>,
        ctx: Option<&RequestTenantContext>,
    ) -> IsolationResult<Self> {
        let tenant_id = enforcer.resolve_tenant(explicit, ctx, "unit of work")?;
        let mut conn = manager.acquire(&tenant_id, ConnectionKind::Tenant).await?;
        conn.begin()
            .await
            .map_err(|err| DatabaseError::from_driver("failed to begin transaction", err))?;
        Ok(Self {
            tenant_id,
            conn,
            op_count: 0,
            outcome: SessionOutcome::Active,
        })
    }

    /// Executes one statement on the held connection.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotActive`] if the session already reached a
    /// terminal outcome; [`DatabaseError`] if the statement fails. A failed
    /// statement does not itself terminate the session - the caller decides
    /// whether to roll back (the usual choice) or continue.
    pub async fn execute(&mut self, statement: Statement) -> IsolationResult<StatementOutcome> {
        if self.outcome != SessionOutcome::Active {
            return Err(SessionError::NotActive {
                outcome: self.outcome.to_string(),
            }
            .into());
        }
        let result = match statement.kind {
            StatementKind::Read => self
                .conn
                .query(&statement.sql, &statement.params)
                .await
                .map(StatementOutcome::Rows),
            StatementKind::Write => self
                .conn
                .execute(&statement.sql, &statement.params)
                .await
                .map(StatementOutcome::Affected),
        };
        let outcome =
            result.map_err(|err| DatabaseError::from_driver("statement failed", err))?;
        self.op_count += 1;
        Ok(outcome)
    }

    /// Commits the session, persisting all statements' effects.
    ///
    /// The session reaches its terminal outcome; any later call fails with
    /// a "not active" error.
    pub async fn commit(&mut self) -> IsolationResult<()> {
        if self.outcome != SessionOutcome::Active {
            return Err(SessionError::NotActive {
                outcome: self.outcome.to_string(),
            }
            .into());
        }
        self.conn
            .commit()
            .await
            .map_err(|err| DatabaseError::from_driver("commit failed", err))?;
        self.outcome = SessionOutcome::Committed;
        Ok(())
    }

    /// Rolls back the session, discarding all statements' effects.
    pub async fn rollback(&mut self) -> IsolationResult<()> {
        if self.outcome != SessionOutcome::Active {
            return Err(SessionError::NotActive {
                outcome: self.outcome.to_string(),
            }
            .into());
        }
        self.conn
            .rollback()
            .await
            .map_err(|err| DatabaseError::from_driver("rollback failed", err))?;
        self.outcome = SessionOutcome::RolledBack;
        Ok(())
    }

    /// Returns the tenant this session is scoped to.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the number of statements executed so far.
    pub fn op_count(&self) -> u32 {
        self.op_count
    }

    /// Returns the session outcome.
    pub fn outcome(&self) -> SessionOutcome {
        self.outcome
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        // The connection itself is released by its own drop; an open
        // transaction is rolled back when the pool recycles it.
        if self.outcome == SessionOutcome::Active {
            tracing::debug!(
                tenant_id = %self.tenant_id,
                op_count = self.op_count,
                "unit of work dropped while active; transaction will roll back on recycle"
            );
        }
    }
}
