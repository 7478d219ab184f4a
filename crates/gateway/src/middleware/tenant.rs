//! Tenant resolution middleware.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use tessera_tenancy::tenant::RequestTenantContext;

use crate::error::GatewayError;
use crate::state::AppState;
use crate::tenant::ResolutionSource;

/// Resolves the request tenant and inserts [`RequestTenantContext`] into
/// request extensions.
pub async fn resolve_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let authority = request.uri().host().map(str::to_string);
    let resolved = state
        .resolver()
        .resolve(request.headers(), authority.as_deref())
        .await?;

    debug!(
        tenant_id = %resolved.tenant_id(),
        source = %resolved.source,
        "resolved request tenant"
    );

    let mut ctx = RequestTenantContext::new(resolved.tenant_id().clone());
    if let Some(request_id) = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
    {
        ctx = ctx.with_correlation_id(request_id);
    }

    request.extensions_mut().insert::<ResolutionSource>(resolved.source);
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
