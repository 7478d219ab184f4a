//! Two-phase auth context construction.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use tessera_tenancy::audit::{AuditSink, CrossTenantAccess};
use tessera_tenancy::tenant::{RequestTenantContext, TenantId};

use crate::error::GatewayError;

use super::revocation::{RevocationCheck, RevocationStore, check_revocation};
use super::{AuthContext, AuthError, TokenDecoder};

/// Builds the per-request [`AuthContext`] from a bearer token.
///
/// Validation order: decode (signature + expiry), revocation lookup, tenant
/// match. Every step fails closed except the revocation lookup, whose
/// fail-soft policy lives in [`check_revocation`].
///
/// A superadmin whose token tenant differs from the resolved request
/// tenant is allowed through, but only after a cross-tenant audit record
/// has been written; a failed audit write refuses the request.
pub struct AuthContextBuilder {
    decoder: TokenDecoder,
    revocation: Arc<dyn RevocationStore>,
    audit: Arc<dyn AuditSink>,
    revocation_timeout: Duration,
}

impl AuthContextBuilder {
    /// Creates a builder with the default revocation timeout (500ms).
    pub fn new(
        decoder: TokenDecoder,
        revocation: Arc<dyn RevocationStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            decoder,
            revocation,
            audit,
            revocation_timeout: Duration::from_millis(500),
        }
    }

    /// Overrides the revocation lookup timeout.
    pub fn with_revocation_timeout(mut self, timeout: Duration) -> Self {
        self.revocation_timeout = timeout;
        self
    }

    /// Builds the auth context for a request.
    pub async fn build(
        &self,
        token: &str,
        ctx: &RequestTenantContext,
    ) -> Result<AuthContext, GatewayError> {
        let claims = self.decoder.decode(token)?;

        match check_revocation(self.revocation.as_ref(), &claims.jti, self.revocation_timeout)
            .await
        {
            RevocationCheck::Revoked => return Err(AuthError::TokenRevoked.into()),
            RevocationCheck::NotRevoked | RevocationCheck::CheckUnavailable => {}
        }

        let token_tenant = TenantId::new(claims.tenant_id.clone());
        if &token_tenant != ctx.tenant_id() {
            if !claims.is_super_admin {
                return Err(AuthError::TenantMismatch {
                    token_tenant,
                    request_tenant: ctx.tenant_id().clone(),
                }
                .into());
            }
            warn!(
                security = true,
                actor = %claims.sub,
                source_tenant = %token_tenant,
                target_tenant = %ctx.tenant_id(),
                "superadmin cross-tenant access"
            );
            let event = CrossTenantAccess::new(
                claims.sub.clone(),
                token_tenant,
                ctx.tenant_id().clone(),
                claims.jti.clone(),
            );
            // The audit record is a precondition of proceeding, not a
            // best-effort side effect.
            self.audit
                .record(event)
                .await
                .map_err(|err| GatewayError::internal(format!("audit write failed: {err}")))?;
        }

        Ok(AuthContext::from_claims(claims))
    }
}
