//! Error types for the tenant isolation layer.
//!
//! This module defines all error types used throughout the isolation layer,
//! organized by concern: tenant identity, pool acquisition, filter
//! enforcement, unit-of-work sessions, and the underlying database driver.
//!
//! Every check in this layer fails closed. The single deliberate fail-soft
//! exception (the token revocation check) lives in the gateway crate and is
//! represented there as an explicit tri-state result, not an error.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::pool::ConnectionKind;
use crate::tenant::TenantId;

/// The primary error type for all isolation-layer operations.
///
/// This enum encompasses all possible errors that can occur while resolving
/// tenants, acquiring connections, enforcing tenant filters, or running
/// unit-of-work sessions.
#[derive(Error, Debug)]
pub enum IsolationError {
    /// Tenant identity and directory errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Connection pool acquisition errors
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// Tenant filter enforcement errors
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Unit-of-work session errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Fatal database failures (connect/driver errors)
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Errors related to tenant identity.
#[derive(Error, Debug)]
pub enum TenantError {
    /// No tenant is registered for the given subdomain.
    #[error("unknown tenant subdomain: {subdomain}")]
    UnknownSubdomain { subdomain: String },

    /// The tenant id is not present in the directory.
    #[error("tenant not registered: {tenant_id}")]
    NotRegistered { tenant_id: TenantId },

    /// The tenant exists but is suspended.
    #[error("tenant suspended: {tenant_id}")]
    Suspended { tenant_id: TenantId },

    /// The tenant identifier is malformed.
    #[error("invalid tenant id {value:?}: {reason}")]
    InvalidId { value: String, reason: String },
}

/// Errors raised while acquiring a connection from the pool manager.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The pool for this tenant is saturated and the bounded wait elapsed.
    ///
    /// This error is retriable; callers should back off and try again.
    #[error("connection pool exhausted for tenant {tenant_id} ({kind}) after {waited_ms}ms")]
    Exhausted {
        tenant_id: TenantId,
        kind: ConnectionKind,
        waited_ms: u64,
    },

    /// The tenant's connection credentials were rejected or could not be
    /// decrypted. Fatal; never retried automatically.
    #[error("credential failure for tenant {tenant_id}: {message}")]
    Credentials { tenant_id: TenantId, message: String },
}

/// Errors raised by the tenant filter enforcer.
#[derive(Error, Debug)]
pub enum FilterError {
    /// A tenant-scoped operation was attempted with no explicit tenant id
    /// and no active request tenant context. This indicates missing wiring
    /// at the infrastructure layer, never a caller mistake.
    #[error("tenant context required for {operation}")]
    ContextRequired { operation: String },

    /// A call requested the unfiltered bypass while the global bypass flag
    /// is disabled. Distinct from `ContextRequired`: the two paths must
    /// never be merged.
    #[error("tenant filter bypass is disabled (requested for {operation})")]
    BypassDisabled { operation: String },
}

/// Errors related to unit-of-work sessions.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A statement was issued against a session that already reached a
    /// terminal outcome.
    #[error("unit of work is not active (outcome: {outcome})")]
    NotActive { outcome: String },
}

/// A fatal failure in the underlying database driver or network.
///
/// Maps to a per-request 500. The message is logged with a correlation code
/// and never echoed verbatim to clients.
#[derive(Error, Debug)]
#[error("database failure: {message}")]
pub struct DatabaseError {
    message: String,
    #[source]
    source: Option<DriverError>,
}

impl DatabaseError {
    /// Creates a database error from a bare message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a database error wrapping a driver error.
    pub fn from_driver(message: impl Into<String>, source: DriverError) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Errors produced by a [`DatabaseDriver`](crate::pool::DatabaseDriver)
/// implementation.
///
/// The pool manager inspects [`DriverError::is_credential`] to decide between
/// the fatal credential path and the fail-soft degrade path.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Authentication was rejected by the database. Fatal.
    #[error("authentication rejected: {0}")]
    Credentials(String),

    /// The connection could not be established for operational reasons
    /// (network, DNS, server overload).
    #[error("connect failed: {0}")]
    Connect(String),

    /// A statement failed to execute.
    #[error("statement failed: {0}")]
    Statement(String),

    /// The connection was lost mid-use.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

impl DriverError {
    /// Returns `true` if this error indicates bad credentials rather than an
    /// operational failure.
    pub fn is_credential(&self) -> bool {
        matches!(self, DriverError::Credentials(_))
    }
}

/// Result type alias for isolation-layer operations.
pub type IsolationResult<T> = Result<T, IsolationError>;
