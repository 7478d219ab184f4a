//! Shared application state for the gateway.

use std::sync::Arc;

use tessera_tenancy::audit::AuditSink;
use tessera_tenancy::pool::{ConnectionPoolManager, DatabaseDriver};
use tessera_tenancy::repository::TenantFilterEnforcer;
use tessera_tenancy::tenant::{CredentialCipher, TenantDirectory};

use crate::auth::{AuthContextBuilder, RevocationStore, TokenDecoder};
use crate::config::ServerConfig;
use crate::tenant::HostTenantResolver;

/// Shared state available to all request handlers and middleware.
///
/// Collaborators (directory, driver, cipher, revocation store, audit sink)
/// are injected as trait objects; everything derived from configuration
/// (resolver, auth builder, pool manager, enforcer) is wired up here.
pub struct AppState {
    config: Arc<ServerConfig>,
    resolver: Arc<HostTenantResolver>,
    auth: Arc<AuthContextBuilder>,
    pools: Arc<ConnectionPoolManager>,
    enforcer: Arc<TenantFilterEnforcer>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            resolver: Arc::clone(&self.resolver),
            auth: Arc::clone(&self.auth),
            pools: Arc::clone(&self.pools),
            enforcer: Arc::clone(&self.enforcer),
        }
    }
}

impl AppState {
    /// Wires the gateway from configuration and collaborators.
    pub fn new(
        config: ServerConfig,
        directory: Arc<dyn TenantDirectory>,
        driver: Arc<dyn DatabaseDriver>,
        cipher: Arc<dyn CredentialCipher>,
        revocation: Arc<dyn RevocationStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let resolver = Arc::new(HostTenantResolver::new(
            config.resolver_settings(),
            Arc::clone(&directory),
        ));
        let auth = Arc::new(
            AuthContextBuilder::new(TokenDecoder::new(&config.jwt_secret), revocation, audit)
                .with_revocation_timeout(config.revocation_timeout()),
        );
        let pools = Arc::new(ConnectionPoolManager::new(
            driver,
            directory,
            cipher,
            config.pool_settings(),
        ));
        let enforcer = Arc::new(TenantFilterEnforcer::new(config.filter_policy()));
        Self {
            config: Arc::new(config),
            resolver,
            auth,
            pools,
            enforcer,
        }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the tenant resolver.
    pub fn resolver(&self) -> &HostTenantResolver {
        &self.resolver
    }

    /// Returns the auth context builder.
    pub fn auth(&self) -> &AuthContextBuilder {
        &self.auth
    }

    /// Returns the connection pool manager.
    pub fn pools(&self) -> &Arc<ConnectionPoolManager> {
        &self.pools
    }

    /// Spawns the background sweep that evicts idle tenant pools.
    ///
    /// Call once at server startup.
    pub fn spawn_pool_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.pools.spawn_idle_sweeper()
    }

    /// Returns the tenant filter enforcer.
    pub fn enforcer(&self) -> &TenantFilterEnforcer {
        &self.enforcer
    }
}
