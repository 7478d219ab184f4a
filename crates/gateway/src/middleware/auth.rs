//! Bearer authentication middleware.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use tessera_tenancy::tenant::RequestTenantContext;

use crate::auth::AuthError;
use crate::error::GatewayError;
use crate::state::AppState;

/// Extracts the bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Validates the bearer token against the resolved tenant context and
/// inserts [`AuthContext`](crate::auth::AuthContext) into request
/// extensions.
///
/// When a superadmin crosses tenants (already audited by the builder), the
/// request's tenant context is re-inserted with the override flag set.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let ctx = request
        .extensions()
        .get::<RequestTenantContext>()
        .cloned()
        .ok_or_else(|| {
            GatewayError::configuration("tenant context missing before authentication")
        })?;

    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;
    let auth = state.auth().build(token, &ctx).await?;

    if auth.tenant_id() != ctx.tenant_id() {
        request
            .extensions_mut()
            .insert(ctx.with_superadmin_override());
    }
    request.extensions_mut().insert(auth);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_scheme_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("bearer abc"),
        );
        assert_eq!(bearer_token(&headers), Some("abc"));
    }

    #[test]
    fn test_non_bearer_schemes_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
