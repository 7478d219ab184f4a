//! Database driver seam.
//!
//! The isolation layer treats the SQL driver as a black box: it asks the
//! driver for connections and hands it bound statements. Implementations
//! adapt a real driver crate; tests use an in-memory double.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DriverError;

/// A result row, as a column → value map.
pub type Row = serde_json::Map<String, Value>;

/// Everything the driver needs to open one connection.
///
/// Built by the pool manager from a tenant's decrypted connection
/// descriptor; the password in here is plaintext and the value is
/// short-lived.
#[derive(Debug, Clone)]
pub struct ConnectInfo {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Connection user.
    pub user: String,
    /// Decrypted password.
    pub password: String,
}

/// A single live database connection.
///
/// Statements always carry their parameters separately; this layer never
/// interpolates values into SQL text. A connection with an open transaction
/// that is dropped or recycled must roll that transaction back.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Runs a read statement, returning its rows.
    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError>;

    /// Runs a write statement, returning the affected-row count.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError>;

    /// Begins a transaction on this connection.
    async fn begin(&mut self) -> Result<(), DriverError>;

    /// Commits the open transaction.
    async fn commit(&mut self) -> Result<(), DriverError>;

    /// Rolls back the open transaction.
    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Returns `true` if a transaction is open on this connection.
    fn in_transaction(&self) -> bool;

    /// Cheap liveness check used when recycling pooled connections.
    async fn ping(&mut self) -> Result<(), DriverError>;
}

/// Connection factory for one database technology.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// [`DriverError::Credentials`] if authentication is rejected (fatal,
    /// never retried); any other variant for operational failures, which
    /// the pool manager may degrade around.
    async fn connect(&self, info: &ConnectInfo) -> Result<Box<dyn Connection>, DriverError>;
}
