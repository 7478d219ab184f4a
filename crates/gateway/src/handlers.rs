//! Infrastructure endpoints.
//!
//! Business module routes are mounted by the application binary; the
//! gateway itself exposes only health/readiness probes and the session
//! introspection endpoint used by smoke checks.

use axum::Json;
use axum::extract::{Extension, State};
use serde::Serialize;
use serde_json::json;

use tessera_tenancy::tenant::RequestTenantContext;

use crate::auth::AuthContext;
use crate::state::AppState;

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe with pool statistics.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.pools().stats();
    Json(json!({
        "status": "ok",
        "pools": stats,
    }))
}

/// Body of the `/whoami` response.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    user_id: String,
    token_tenant: String,
    request_tenant: String,
    access_level: u8,
    is_superadmin: bool,
    superadmin_override: bool,
}

/// Returns the authenticated session's identity and tenant scope.
pub async fn whoami(
    Extension(auth): Extension<AuthContext>,
    Extension(ctx): Extension<RequestTenantContext>,
) -> Json<SessionSummary> {
    Json(SessionSummary {
        user_id: auth.user_id().to_string(),
        token_tenant: auth.tenant_id().to_string(),
        request_tenant: ctx.tenant_id().to_string(),
        access_level: auth.access_level().value(),
        is_superadmin: auth.is_superadmin(),
        superadmin_override: ctx.is_superadmin_override(),
    })
}
