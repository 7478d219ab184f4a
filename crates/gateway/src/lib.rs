//! Tessera Platform Gateway
//!
//! The HTTP boundary of the Tessera platform. Every inbound request passes
//! through two stages before reaching a handler:
//!
//! 1. **Tenant resolution** - the Host header (and, in development mode, a
//!    re-validated Origin fallback) is resolved to an active tenant and a
//!    [`RequestTenantContext`](tessera_tenancy::tenant::RequestTenantContext)
//!    is attached to the request.
//! 2. **Authentication** - the bearer token is decoded, checked against
//!    the revocation store, and its tenant claim validated against the
//!    resolved tenant. Superadmin cross-tenant access is audited before it
//!    proceeds.
//!
//! Downstream, handlers use the tenancy crate's pool manager, filter
//! enforcer, and unit-of-work scopes for all data access.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tessera_gateway::{AppState, ServerConfig, router, telemetry};
//!
//! let config = ServerConfig::from_env();
//! telemetry::init_tracing(&config.log_level);
//! let state = AppState::new(config, directory, driver, cipher, revocation, audit);
//! let app = router(state);
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod telemetry;
pub mod tenant;

pub use config::{DeploymentMode, ServerConfig};
pub use error::GatewayError;
pub use state::AppState;

use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::get;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Builds the gateway router.
///
/// Health probes sit outside the tenant/auth stack; everything else runs
/// behind tenant resolution and bearer authentication.
pub fn router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config().request_timeout);

    let protected = Router::new()
        .route("/whoami", get(handlers::whoami))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::tenant::resolve_tenant,
        ));

    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/readyz", get(handlers::ready))
        .merge(protected)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
