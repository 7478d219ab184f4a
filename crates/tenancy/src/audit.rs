//! Security audit events.
//!
//! Cross-tenant access by a superadmin principal must produce an audit
//! record before the request proceeds. The audit writer itself is an
//! external collaborator behind [`AuditSink`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::tenant::TenantId;

/// A superadmin crossing a tenant boundary.
#[derive(Debug, Clone, Serialize)]
pub struct CrossTenantAccess {
    /// Unique event id.
    pub id: Uuid,
    /// The acting principal's user id.
    pub actor_user_id: String,
    /// The tenant the actor's token was issued for.
    pub source_tenant: TenantId,
    /// The tenant the request resolved to.
    pub target_tenant: TenantId,
    /// The token's unique id.
    pub token_jti: String,
    /// When the access was validated.
    pub at: DateTime<Utc>,
}

impl CrossTenantAccess {
    /// Creates a new event stamped with the current time.
    pub fn new(
        actor_user_id: impl Into<String>,
        source_tenant: TenantId,
        target_tenant: TenantId,
        token_jti: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_user_id: actor_user_id.into(),
            source_tenant,
            target_tenant,
            token_jti: token_jti.into(),
            at: Utc::now(),
        }
    }
}

/// Failure to persist an audit record.
///
/// Audit writes are fail-closed: a request whose audit record cannot be
/// written does not proceed.
#[derive(Error, Debug)]
#[error("audit sink failure: {0}")]
pub struct AuditError(pub String);

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persists one cross-tenant access record.
    async fn record(&self, event: CrossTenantAccess) -> Result<(), AuditError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_carries_both_tenants() {
        let event = CrossTenantAccess::new(
            "user-1",
            TenantId::new("acme"),
            TenantId::new("globex"),
            "jti-1",
        );
        assert_eq!(event.source_tenant.as_str(), "acme");
        assert_eq!(event.target_tenant.as_str(), "globex");
        assert_eq!(event.actor_user_id, "user-1");
    }

    #[test]
    fn test_events_have_unique_ids() {
        let a = CrossTenantAccess::new("u", TenantId::new("a"), TenantId::new("b"), "j");
        let b = CrossTenantAccess::new("u", TenantId::new("a"), TenantId::new("b"), "j");
        assert_ne!(a.id, b.id);
    }
}
