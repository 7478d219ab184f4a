//! Error types for the gateway layer.
//!
//! This module defines the gateway's error taxonomy and its mapping to HTTP
//! responses.
//!
//! # Error Mapping
//!
//! | Error | HTTP Status | Notes |
//! |-------|-------------|-------|
//! | Authentication (invalid/expired/revoked token) | 401 | |
//! | Authorization (wrong tenant, insufficient level) | 403 | |
//! | TenantNotFound (unknown subdomain) | 404 | |
//! | TenantForbidden (suspended tenant) | 403 | |
//! | PoolExhausted | 503 | retriable; carries Retry-After |
//! | Configuration (missing infra wiring) | 500 | correlation code only |
//! | Database (connect/driver failure) | 500 | correlation code only |
//!
//! 5xx responses never expose internal detail: the body carries a
//! correlation id and the detail goes to the log under that id.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use tracing::error;
use uuid::Uuid;

use tessera_tenancy::error::{FilterError, IsolationError, PoolError};

use crate::auth::AuthError;
use crate::tenant::ResolveError;

/// The primary error type for gateway operations.
#[derive(Debug)]
pub enum GatewayError {
    /// Required infrastructure wiring is missing (HTTP 500). Never
    /// attributable to the caller.
    Configuration {
        /// Internal detail; logged, not echoed.
        message: String,
    },

    /// The bearer token failed authentication (HTTP 401).
    Authentication(AuthError),

    /// The principal is authenticated but not allowed (HTTP 403).
    Authorization {
        /// Reason, safe to return to the caller.
        message: String,
    },

    /// No tenant is registered for the request's subdomain (HTTP 404).
    TenantNotFound {
        /// The unresolvable subdomain.
        subdomain: String,
    },

    /// The tenant exists but is suspended (HTTP 403).
    TenantForbidden {
        /// The suspended subdomain.
        subdomain: String,
    },

    /// The tenant's connection pool is saturated (HTTP 503, retriable).
    PoolExhausted {
        /// Suggested client backoff.
        retry_after_secs: u64,
    },

    /// Database or internal failure (HTTP 500).
    Internal {
        /// Internal detail; logged, not echoed.
        message: String,
    },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Configuration { message } => {
                write!(f, "configuration error: {}", message)
            }
            GatewayError::Authentication(err) => write!(f, "authentication failed: {}", err),
            GatewayError::Authorization { message } => write!(f, "forbidden: {}", message),
            GatewayError::TenantNotFound { subdomain } => {
                write!(f, "unknown tenant: {}", subdomain)
            }
            GatewayError::TenantForbidden { subdomain } => {
                write!(f, "tenant suspended: {}", subdomain)
            }
            GatewayError::PoolExhausted { .. } => write!(f, "connection pool exhausted"),
            GatewayError::Internal { message } => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for GatewayError {}

impl GatewayError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        GatewayError::Configuration {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal {
            message: message.into(),
        }
    }
}

/// JSON problem body returned for every gateway error.
#[derive(Debug, Serialize)]
struct ProblemBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message, correlation_id) = match &self {
            GatewayError::Configuration { message } => {
                let correlation_id = Uuid::new_v4().to_string();
                error!(correlation_id = %correlation_id, detail = %message, "configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration-error",
                    "internal configuration error".to_string(),
                    Some(correlation_id),
                )
            }
            GatewayError::Authentication(err) => (
                StatusCode::UNAUTHORIZED,
                "authentication-failed",
                err.to_string(),
                None,
            ),
            GatewayError::Authorization { message } => (
                StatusCode::FORBIDDEN,
                "forbidden",
                message.clone(),
                None,
            ),
            GatewayError::TenantNotFound { subdomain } => (
                StatusCode::NOT_FOUND,
                "tenant-not-found",
                format!("no tenant is registered for subdomain {subdomain:?}"),
                None,
            ),
            GatewayError::TenantForbidden { subdomain } => (
                StatusCode::FORBIDDEN,
                "tenant-suspended",
                format!("tenant {subdomain:?} is suspended"),
                None,
            ),
            GatewayError::PoolExhausted { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "pool-exhausted",
                "database connections are saturated; retry with backoff".to_string(),
                None,
            ),
            GatewayError::Internal { message } => {
                let correlation_id = Uuid::new_v4().to_string();
                error!(correlation_id = %correlation_id, detail = %message, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal-error",
                    "internal error".to_string(),
                    Some(correlation_id),
                )
            }
        };

        let retry_after = match &self {
            GatewayError::PoolExhausted { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = (
            status,
            Json(ProblemBody {
                code,
                message,
                correlation_id,
            }),
        )
            .into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TenantMismatch { .. } | AuthError::InsufficientAccess { .. } => {
                GatewayError::Authorization {
                    message: err.to_string(),
                }
            }
            _ => GatewayError::Authentication(err),
        }
    }
}

impl From<ResolveError> for GatewayError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnknownTenant { subdomain } => GatewayError::TenantNotFound { subdomain },
            ResolveError::TenantSuspended { subdomain } => {
                GatewayError::TenantForbidden { subdomain }
            }
            ResolveError::MissingHost | ResolveError::AmbiguousHost { .. } => {
                GatewayError::configuration(err.to_string())
            }
        }
    }
}

impl From<IsolationError> for GatewayError {
    fn from(err: IsolationError) -> Self {
        match &err {
            IsolationError::Pool(PoolError::Exhausted { .. }) => GatewayError::PoolExhausted {
                retry_after_secs: 1,
            },
            IsolationError::Filter(FilterError::ContextRequired { .. }) => {
                GatewayError::configuration(err.to_string())
            }
            IsolationError::Filter(FilterError::BypassDisabled { .. }) => {
                GatewayError::Authorization {
                    message: err.to_string(),
                }
            }
            _ => GatewayError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_tenancy::pool::ConnectionKind;
    use tessera_tenancy::tenant::TenantId;

    #[test]
    fn test_pool_exhausted_maps_to_503() {
        let err: GatewayError = IsolationError::Pool(PoolError::Exhausted {
            tenant_id: TenantId::new("acme"),
            kind: ConnectionKind::Tenant,
            waited_ms: 5000,
        })
        .into();
        assert!(matches!(err, GatewayError::PoolExhausted { .. }));
    }

    #[test]
    fn test_missing_context_maps_to_configuration() {
        let err: GatewayError = IsolationError::Filter(FilterError::ContextRequired {
            operation: "employees".to_string(),
        })
        .into();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[test]
    fn test_resolve_errors_map_to_client_statuses() {
        let err: GatewayError = ResolveError::UnknownTenant {
            subdomain: "ghost".to_string(),
        }
        .into();
        assert!(matches!(err, GatewayError::TenantNotFound { .. }));

        let err: GatewayError = ResolveError::TenantSuspended {
            subdomain: "oldcorp".to_string(),
        }
        .into();
        assert!(matches!(err, GatewayError::TenantForbidden { .. }));

        let err: GatewayError = ResolveError::MissingHost.into();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_500_body_hides_detail() {
        let response =
            GatewayError::internal("tokio_postgres: password authentication failed")
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "internal error");
        assert!(body["correlation_id"].as_str().is_some());
        assert!(!body.to_string().contains("password"));
    }

    #[tokio::test]
    async fn test_pool_exhausted_sets_retry_after() {
        let response = GatewayError::PoolExhausted {
            retry_after_secs: 1,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from_static("1")
        );
    }
}
