//! Per-tenant connection pool management.
//!
//! The [`ConnectionPoolManager`] owns a directory of bounded, evictable
//! connection pools keyed by `(ConnectionKind, TenantId)`. Pools are created
//! lazily on first acquisition and destroyed by idle-timeout or
//! LRU-over-cap eviction. The inner pool primitive is `deadpool`; the
//! manager's own lock covers only structural mutations (create/evict), so
//! steady-state checkout from an existing pool never contends with other
//! tenants' pool-creation work.
//!
//! The actual database driver is a black box behind [`DatabaseDriver`];
//! this layer never builds SQL wire traffic itself.

mod driver;
mod manager;
mod settings;

pub use driver::{Connection, ConnectInfo, DatabaseDriver, Row};
pub use manager::{
    ConnectionKind, ConnectionPoolManager, DriverManager, PoolEntryStats, PoolStats,
    ScopedConnection,
};
pub use settings::PoolSettings;
