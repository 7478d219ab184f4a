//! Gateway server configuration.
//!
//! Supports programmatic construction, command line arguments, and
//! environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_HOST` | 127.0.0.1 | Host to bind |
//! | `GATEWAY_PORT` | 8080 | Server port |
//! | `GATEWAY_LOG_LEVEL` | info | Log level |
//! | `DEPLOYMENT_MODE` | production | Host/Origin trust policy |
//! | `GATEWAY_BASE_DOMAIN` | - | Base domain for subdomain extraction |
//! | `GATEWAY_DEV_DEFAULT_TENANT` | - | Development fallback tenant |
//! | `GATEWAY_JWT_SECRET` | - | HS256 token secret |
//! | `REVOCATION_CHECK_TIMEOUT_MS` | 500 | Revocation lookup timeout |
//! | `MAX_TENANT_POOLS` | 50 | Global live-pool cap |
//! | `TENANT_POOL_SIZE` | 5 | Base connections per tenant pool |
//! | `TENANT_POOL_MAX_OVERFLOW` | 10 | Extra connections under load |
//! | `POOL_INACTIVITY_TIMEOUT` | 300 | Idle pool eviction (seconds) |
//! | `ALLOW_TENANT_FILTER_BYPASS` | false | Enables the maintenance bypass |
//! | `ENABLE_CONNECTION_POOLING` | true | Pooled vs direct connections |

use std::time::Duration;

use clap::{Parser, ValueEnum};

use tessera_tenancy::pool::PoolSettings;
use tessera_tenancy::repository::FilterPolicy;

use crate::tenant::ResolverSettings;

/// Deployment mode controlling the Host/Origin trust policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeploymentMode {
    /// Strict: Host header only, no fallback.
    Production,
    /// Loopback hosts may fall back to a re-validated Origin header.
    Development,
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Production => write!(f, "production"),
            DeploymentMode::Development => write!(f, "development"),
        }
    }
}

/// Server configuration for the gateway.
///
/// Construct from the environment with [`ServerConfig::from_env`], from
/// command line arguments with [`ServerConfig::parse`], or
/// programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "tessera-gateway")]
#[command(about = "Tessera platform gateway")]
pub struct ServerConfig {
    /// Host address to bind to.
    #[arg(long, env = "GATEWAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "GATEWAY_PORT", default_value = "8080")]
    pub port: u16,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "GATEWAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Deployment mode (production or development).
    #[arg(long, env = "DEPLOYMENT_MODE", value_enum, default_value_t = DeploymentMode::Production)]
    pub deployment_mode: DeploymentMode,

    /// Base domain tenants are served under; required in production.
    #[arg(long, env = "GATEWAY_BASE_DOMAIN")]
    pub base_domain: Option<String>,

    /// Development-mode default tenant subdomain.
    #[arg(long, env = "GATEWAY_DEV_DEFAULT_TENANT")]
    pub dev_default_tenant: Option<String>,

    /// Secret for HS256 access token validation.
    #[arg(long, env = "GATEWAY_JWT_SECRET", hide_env_values = true, default_value = "")]
    pub jwt_secret: String,

    /// Revocation store lookup timeout in milliseconds.
    #[arg(long, env = "REVOCATION_CHECK_TIMEOUT_MS", default_value = "500")]
    pub revocation_check_timeout_ms: u64,

    /// Global cap on live per-tenant pools.
    #[arg(long, env = "MAX_TENANT_POOLS", default_value = "50")]
    pub max_tenant_pools: usize,

    /// Base connections per tenant pool.
    #[arg(long, env = "TENANT_POOL_SIZE", default_value = "5")]
    pub tenant_pool_size: usize,

    /// Extra connections a pool may open under load.
    #[arg(long, env = "TENANT_POOL_MAX_OVERFLOW", default_value = "10")]
    pub tenant_pool_max_overflow: usize,

    /// Idle pool eviction timeout in seconds.
    #[arg(long, env = "POOL_INACTIVITY_TIMEOUT", default_value = "300")]
    pub pool_inactivity_timeout: u64,

    /// Enables the maintenance tenant-filter bypass.
    #[arg(
        long,
        env = "ALLOW_TENANT_FILTER_BYPASS",
        default_value_t = false,
        action = clap::ArgAction::Set
    )]
    pub allow_tenant_filter_bypass: bool,

    /// When false, every acquisition opens a direct unpooled connection.
    #[arg(
        long,
        env = "ENABLE_CONNECTION_POOLING",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_connection_pooling: bool,

    /// Request timeout in seconds.
    #[arg(long, env = "GATEWAY_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            deployment_mode: DeploymentMode::Production,
            base_domain: None,
            dev_default_tenant: None,
            jwt_secret: String::new(),
            revocation_check_timeout_ms: 500,
            max_tenant_pools: 50,
            tenant_pool_size: 5,
            tenant_pool_max_overflow: 10,
            pool_inactivity_timeout: 300,
            allow_tenant_filter_bypass: false,
            enable_connection_pooling: true,
            request_timeout: 30,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the pool manager settings derived from this configuration.
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_tenant_pools: self.max_tenant_pools,
            pool_size: self.tenant_pool_size,
            max_overflow: self.tenant_pool_max_overflow,
            inactivity_timeout_secs: self.pool_inactivity_timeout,
            enable_pooling: self.enable_connection_pooling,
            ..PoolSettings::default()
        }
    }

    /// Returns the filter enforcement policy.
    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy {
            allow_bypass: self.allow_tenant_filter_bypass,
        }
    }

    /// Returns the tenant resolver settings.
    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            mode: self.deployment_mode,
            base_domain: self.base_domain.clone(),
            dev_default_subdomain: self.dev_default_tenant.clone(),
        }
    }

    /// Returns the revocation lookup timeout.
    pub fn revocation_timeout(&self) -> Duration {
        Duration::from_millis(self.revocation_check_timeout_ms)
    }

    /// Validates the configuration and returns accumulated errors.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }
        if self.jwt_secret.is_empty() {
            errors.push("JWT secret must be set".to_string());
        }
        if self.deployment_mode == DeploymentMode::Production && self.base_domain.is_none() {
            errors.push("Base domain is required in production mode".to_string());
        }
        if self.max_tenant_pools == 0 {
            errors.push("Max tenant pools cannot be 0".to_string());
        }
        if self.tenant_pool_size == 0 {
            errors.push("Tenant pool size cannot be 0".to_string());
        }
        if self.revocation_check_timeout_ms == 0 {
            errors.push("Revocation check timeout cannot be 0".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            port: 0, // Let the OS assign a port
            log_level: "debug".to_string(),
            deployment_mode: DeploymentMode::Development,
            dev_default_tenant: Some("dev".to_string()),
            jwt_secret: "test-secret".to_string(),
            revocation_check_timeout_ms: 100,
            max_tenant_pools: 4,
            tenant_pool_size: 2,
            tenant_pool_max_overflow: 2,
            pool_inactivity_timeout: 1,
            request_timeout: 5,
            ..Default::default()
        }
    }
}
