//! The connection pool manager.
//!
//! Owns the process-wide directory of per-tenant pools. This is the one
//! piece of genuinely shared mutable state in the isolation layer: all
//! structural mutation (pool creation, eviction) happens under the
//! directory mutex, while connection checkout and return ride on the pool
//! primitive's own synchronization.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use deadpool::Runtime;
use deadpool::managed::{self, Metrics, Object, Pool, RecycleError, RecycleResult};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::{
    DatabaseError, DriverError, IsolationResult, PoolError, TenantError,
};
use crate::tenant::{
    CredentialCipher, RequestTenantContext, TenantDirectory, TenantId, TenantIdentity,
};

use super::driver::{ConnectInfo, Connection, DatabaseDriver, Row};
use super::settings::PoolSettings;

/// The kind of connection being requested.
///
/// A closed set: ordinary tenant-role connections for application data
/// access, and admin-role connections for maintenance operations against a
/// tenant's database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Application data access under the tenant's database role.
    Tenant,
    /// Maintenance access under the admin role.
    Admin,
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::Tenant => write!(f, "tenant"),
            ConnectionKind::Admin => write!(f, "admin"),
        }
    }
}

/// Key identifying one pool in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    kind: ConnectionKind,
    tenant_id: TenantId,
}

/// deadpool manager bridging to the [`DatabaseDriver`] seam.
pub struct DriverManager {
    driver: Arc<dyn DatabaseDriver>,
    info: ConnectInfo,
}

impl fmt::Debug for DriverManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverManager")
            .field("host", &self.info.host)
            .field("database", &self.info.database)
            .finish_non_exhaustive()
    }
}

impl managed::Manager for DriverManager {
    type Type = Box<dyn Connection>;
    type Error = DriverError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.driver.connect(&self.info).await
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _metrics: &Metrics,
    ) -> RecycleResult<Self::Error> {
        // A connection handed back mid-transaction must not leak that
        // transaction into the next checkout.
        if conn.in_transaction() {
            conn.rollback().await.map_err(RecycleError::Backend)?;
        }
        conn.ping().await.map_err(RecycleError::Backend)
    }
}

/// A connection scoped to one acquisition.
///
/// Release is RAII: dropping the value returns a pooled connection to its
/// pool (or closes a direct connection) on every exit path, including
/// errors and cancellation.
pub enum ScopedConnection {
    /// Checked out of a per-tenant pool.
    Pooled(Object<DriverManager>),
    /// A single unpooled connection, used when pooling is disabled or as
    /// the per-request degrade path after an operational pool failure.
    Direct(Box<dyn Connection>),
}

impl fmt::Debug for ScopedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopedConnection::Pooled(_) => write!(f, "ScopedConnection::Pooled"),
            ScopedConnection::Direct(_) => write!(f, "ScopedConnection::Direct"),
        }
    }
}

impl ScopedConnection {
    fn conn_mut(&mut self) -> &mut dyn Connection {
        match self {
            ScopedConnection::Pooled(object) => &mut ***object,
            ScopedConnection::Direct(conn) => &mut **conn,
        }
    }

    /// Returns `true` if this is a direct (unpooled) connection.
    pub fn is_direct(&self) -> bool {
        matches!(self, ScopedConnection::Direct(_))
    }

    /// Runs a read statement on this connection.
    pub async fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        self.conn_mut().query(sql, params).await
    }

    /// Runs a write statement on this connection.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError> {
        self.conn_mut().execute(sql, params).await
    }

    /// Begins a transaction on this connection.
    pub async fn begin(&mut self) -> Result<(), DriverError> {
        self.conn_mut().begin().await
    }

    /// Commits the open transaction.
    pub async fn commit(&mut self) -> Result<(), DriverError> {
        self.conn_mut().commit().await
    }

    /// Rolls back the open transaction.
    pub async fn rollback(&mut self) -> Result<(), DriverError> {
        self.conn_mut().rollback().await
    }
}

struct PoolEntry {
    pool: Pool<DriverManager>,
    created_at: Instant,
    last_used_at: Instant,
}

/// Point-in-time statistics for one pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolEntryStats {
    /// The tenant this pool belongs to.
    pub tenant_id: TenantId,
    /// The connection kind.
    pub kind: ConnectionKind,
    /// Total connections currently held by the pool.
    pub size: usize,
    /// Connections available for checkout.
    pub available: usize,
    /// Connections currently checked out.
    pub checked_out: usize,
}

/// Point-in-time statistics for the whole manager.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    /// Number of live pools across all tenants and kinds.
    pub live_pools: usize,
    /// Per-pool statistics.
    pub entries: Vec<PoolEntryStats>,
}

/// Manages bounded, evictable per-tenant connection pools.
///
/// Pools are created lazily on first acquisition for a `(kind, tenant)`
/// pair and destroyed by idle-timeout or LRU-over-cap eviction. Checkout of
/// an existing pool does not hold the directory lock, so it is never
/// blocked by unrelated tenants' pool-creation work.
///
/// # Failure policy
///
/// - Saturated pool past the bounded wait: retriable
///   [`PoolError::Exhausted`].
/// - Operational create/checkout failure (network, overload): degrade to a
///   single direct connection for this one request, logged as a security-
///   relevant degrade event.
/// - Credential failure (rejected auth, undecryptable secret): fatal
///   [`PoolError::Credentials`], never retried automatically.
pub struct ConnectionPoolManager {
    driver: Arc<dyn DatabaseDriver>,
    directory: Arc<dyn TenantDirectory>,
    cipher: Arc<dyn CredentialCipher>,
    settings: PoolSettings,
    pools: Mutex<HashMap<PoolKey, PoolEntry>>,
}

impl fmt::Debug for ConnectionPoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPoolManager")
            .field("settings", &self.settings)
            .field("live_pools", &self.pools.lock().len())
            .finish_non_exhaustive()
    }
}

impl ConnectionPoolManager {
    /// Creates a new manager.
    pub fn new(
        driver: Arc<dyn DatabaseDriver>,
        directory: Arc<dyn TenantDirectory>,
        cipher: Arc<dyn CredentialCipher>,
        settings: PoolSettings,
    ) -> Self {
        Self {
            driver,
            directory,
            cipher,
            settings,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the settings this manager was built with.
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Acquires a connection for the given tenant and kind.
    ///
    /// The returned [`ScopedConnection`] releases itself on drop.
    pub async fn acquire(
        &self,
        tenant_id: &TenantId,
        kind: ConnectionKind,
    ) -> IsolationResult<ScopedConnection> {
        let identity = self
            .directory
            .lookup_by_id(tenant_id)
            .await
            .ok_or_else(|| TenantError::NotRegistered {
                tenant_id: tenant_id.clone(),
            })?;
        if !identity.is_active() {
            return Err(TenantError::Suspended {
                tenant_id: tenant_id.clone(),
            }
            .into());
        }

        let info = self.connect_info(&identity, kind)?;

        if !self.settings.enable_pooling {
            let conn = self.connect_direct(tenant_id, &info).await?;
            return Ok(ScopedConnection::Direct(conn));
        }

        let pool = self.pool_for(kind, tenant_id, &info)?;
        match pool.get().await {
            Ok(object) => Ok(ScopedConnection::Pooled(object)),
            Err(managed::PoolError::Timeout(_)) => Err(PoolError::Exhausted {
                tenant_id: tenant_id.clone(),
                kind,
                waited_ms: self.settings.acquire_timeout_ms,
            }
            .into()),
            Err(managed::PoolError::Backend(err)) if err.is_credential() => {
                Err(PoolError::Credentials {
                    tenant_id: tenant_id.clone(),
                    message: err.to_string(),
                }
                .into())
            }
            Err(managed::PoolError::Backend(err)) => {
                warn!(
                    tenant_id = %tenant_id,
                    kind = %kind,
                    error = %err,
                    "pooled checkout failed; degrading to a direct connection for this request"
                );
                let conn = self.connect_direct(tenant_id, &info).await?;
                Ok(ScopedConnection::Direct(conn))
            }
            Err(err) => Err(DatabaseError::new(format!("pool checkout failed: {err}")).into()),
        }
    }

    /// Acquires a connection for the tenant in the given request context.
    pub async fn acquire_for_context(
        &self,
        ctx: &RequestTenantContext,
        kind: ConnectionKind,
    ) -> IsolationResult<ScopedConnection> {
        self.acquire(ctx.tenant_id(), kind).await
    }

    /// Evicts pools idle longer than the configured inactivity timeout.
    ///
    /// Returns the number of pools evicted. Normally driven by the
    /// background sweeper; exposed for deterministic maintenance.
    pub fn evict_idle_pools(&self) -> usize {
        let timeout = Duration::from_secs(self.settings.inactivity_timeout_secs);
        let now = Instant::now();
        let mut pools = self.pools.lock();
        let expired: Vec<PoolKey> = pools
            .iter()
            .filter(|(_, entry)| {
                let status = entry.pool.status();
                now.duration_since(entry.last_used_at) >= timeout
                    && status.size == status.available
            })
            .map(|(key, _)| key.clone())
            .collect();
        let evicted = expired.len();
        for key in expired {
            if let Some(entry) = pools.remove(&key) {
                entry.pool.close();
                debug!(tenant_id = %key.tenant_id, kind = %key.kind, "evicted idle pool");
            }
        }
        evicted
    }

    /// Spawns the background sweep that evicts idle pools.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = Duration::from_secs((self.settings.inactivity_timeout_secs / 2).clamp(1, 60));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = manager.evict_idle_pools();
                if evicted > 0 {
                    debug!(evicted, "idle pool sweep complete");
                }
            }
        })
    }

    /// Returns the number of live pools.
    pub fn live_pool_count(&self) -> usize {
        self.pools.lock().len()
    }

    /// Returns point-in-time statistics for all live pools.
    pub fn stats(&self) -> PoolStats {
        let pools = self.pools.lock();
        let entries = pools
            .iter()
            .map(|(key, entry)| {
                let status = entry.pool.status();
                PoolEntryStats {
                    tenant_id: key.tenant_id.clone(),
                    kind: key.kind,
                    size: status.size,
                    available: status.available,
                    checked_out: status.size.saturating_sub(status.available),
                }
            })
            .collect();
        PoolStats {
            live_pools: pools.len(),
            entries,
        }
    }

    /// Closes every pool and clears the directory.
    pub fn shutdown(&self) {
        let mut pools = self.pools.lock();
        for (key, entry) in pools.drain() {
            entry.pool.close();
            debug!(tenant_id = %key.tenant_id, kind = %key.kind, "closed pool on shutdown");
        }
    }

    fn connect_info(
        &self,
        identity: &TenantIdentity,
        kind: ConnectionKind,
    ) -> Result<ConnectInfo, PoolError> {
        let descriptor = identity.connection();
        let credential_failure = |err: crate::tenant::CredentialError| PoolError::Credentials {
            tenant_id: identity.tenant_id().clone(),
            message: err.to_string(),
        };
        let (user, password) = match kind {
            ConnectionKind::Tenant => (
                descriptor.user.clone(),
                self.cipher
                    .decrypt(&descriptor.encrypted_password)
                    .map_err(credential_failure)?,
            ),
            ConnectionKind::Admin => (
                self.settings.admin_user.clone(),
                self.cipher
                    .decrypt(&self.settings.admin_encrypted_password)
                    .map_err(credential_failure)?,
            ),
        };
        Ok(ConnectInfo {
            host: descriptor.host.clone(),
            port: descriptor.port,
            database: descriptor.database.clone(),
            user,
            password,
        })
    }

    async fn connect_direct(
        &self,
        tenant_id: &TenantId,
        info: &ConnectInfo,
    ) -> IsolationResult<Box<dyn Connection>> {
        match self.driver.connect(info).await {
            Ok(conn) => Ok(conn),
            Err(err) if err.is_credential() => Err(PoolError::Credentials {
                tenant_id: tenant_id.clone(),
                message: err.to_string(),
            }
            .into()),
            Err(err) => {
                Err(DatabaseError::from_driver("direct connection failed", err).into())
            }
        }
    }

    /// Returns the pool for `(kind, tenant)`, creating it if absent.
    ///
    /// The directory lock is held only for the map lookup/insert; checkout
    /// happens on the returned handle after the lock is released.
    fn pool_for(
        &self,
        kind: ConnectionKind,
        tenant_id: &TenantId,
        info: &ConnectInfo,
    ) -> Result<Pool<DriverManager>, DatabaseError> {
        let key = PoolKey {
            kind,
            tenant_id: tenant_id.clone(),
        };
        let mut pools = self.pools.lock();
        if let Some(entry) = pools.get_mut(&key) {
            entry.last_used_at = Instant::now();
            return Ok(entry.pool.clone());
        }

        let manager = DriverManager {
            driver: Arc::clone(&self.driver),
            info: info.clone(),
        };
        let pool = Pool::builder(manager)
            .max_size(self.settings.max_connections_per_pool())
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(Duration::from_millis(self.settings.acquire_timeout_ms)))
            .build()
            .map_err(|err| DatabaseError::new(format!("pool construction failed: {err}")))?;
        debug!(tenant_id = %tenant_id, kind = %kind, "created connection pool");

        let now = Instant::now();
        pools.insert(
            key,
            PoolEntry {
                pool: pool.clone(),
                created_at: now,
                last_used_at: now,
            },
        );
        if pools.len() > self.settings.max_tenant_pools {
            self.evict_lru_locked(&mut pools);
        }
        Ok(pool)
    }

    fn evict_lru_locked(&self, pools: &mut HashMap<PoolKey, PoolEntry>) {
        // Prefer pools with no checked-out connections; if every pool is
        // busy, the overall least recently used one is closed (checked-out
        // connections stay valid until dropped).
        let victim = pools
            .iter()
            .filter(|(_, entry)| {
                let status = entry.pool.status();
                status.size == status.available
            })
            .min_by_key(|(_, entry)| entry.last_used_at)
            .map(|(key, _)| key.clone())
            .or_else(|| {
                pools
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used_at)
                    .map(|(key, _)| key.clone())
            });
        if let Some(key) = victim {
            if let Some(entry) = pools.remove(&key) {
                entry.pool.close();
                let age_secs = entry.created_at.elapsed().as_secs();
                warn!(
                    tenant_id = %key.tenant_id,
                    kind = %key.kind,
                    age_secs,
                    "evicted least recently used pool over global cap"
                );
            }
        }
    }
}
