//! Pool manager configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the connection pool manager.
///
/// # Example
///
/// ```
/// use tessera_tenancy::pool::PoolSettings;
///
/// let settings = PoolSettings {
///     max_tenant_pools: 100,
///     pool_size: 5,
///     max_overflow: 10,
///     ..Default::default()
/// };
/// assert_eq!(settings.max_connections_per_pool(), 15);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Global cap on live pools across all tenants and kinds.
    ///
    /// Exceeding the cap evicts the least recently used idle pool.
    #[serde(default = "default_max_tenant_pools")]
    pub max_tenant_pools: usize,

    /// Base number of connections per tenant pool.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Additional connections a pool may open beyond its base size under
    /// load.
    #[serde(default = "default_max_overflow")]
    pub max_overflow: usize,

    /// Pools idle longer than this are evicted by the background sweep.
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,

    /// Bounded wait for a connection from a saturated pool before the
    /// acquisition fails as retriable exhaustion.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// When false, every acquisition opens a direct unpooled connection.
    #[serde(default = "default_true")]
    pub enable_pooling: bool,

    /// Database user for admin-kind connections.
    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// Encrypted password for admin-kind connections.
    #[serde(default)]
    pub admin_encrypted_password: String,
}

fn default_max_tenant_pools() -> usize {
    50
}

fn default_pool_size() -> usize {
    5
}

fn default_max_overflow() -> usize {
    10
}

fn default_inactivity_timeout_secs() -> u64 {
    300
}

fn default_acquire_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_admin_user() -> String {
    "tessera_admin".to_string()
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_tenant_pools: default_max_tenant_pools(),
            pool_size: default_pool_size(),
            max_overflow: default_max_overflow(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            enable_pooling: default_true(),
            admin_user: default_admin_user(),
            admin_encrypted_password: String::new(),
        }
    }
}

impl PoolSettings {
    /// Creates settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the global pool cap.
    pub fn with_max_tenant_pools(mut self, max: usize) -> Self {
        self.max_tenant_pools = max;
        self
    }

    /// Sets the per-pool base size.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Sets the overflow allowance.
    pub fn with_max_overflow(mut self, overflow: usize) -> Self {
        self.max_overflow = overflow;
        self
    }

    /// Sets the acquire wait bound in milliseconds.
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Sets the idle eviction timeout in seconds.
    pub fn with_inactivity_timeout_secs(mut self, secs: u64) -> Self {
        self.inactivity_timeout_secs = secs;
        self
    }

    /// Disables pooling entirely (direct connections only).
    pub fn without_pooling(mut self) -> Self {
        self.enable_pooling = false;
        self
    }

    /// Returns the hard connection ceiling for one pool.
    pub fn max_connections_per_pool(&self) -> usize {
        self.pool_size + self.max_overflow
    }
}
