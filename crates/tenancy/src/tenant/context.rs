//! Request-scoped tenant context.
//!
//! [`RequestTenantContext`] is created once at request entry (by the
//! gateway's tenant resolution middleware) and threaded explicitly through
//! every downstream call in that request. It is deliberately plain,
//! immutable data - never a process-global or a shared mutable field - so
//! concurrent requests for different tenants cannot contaminate each other.

use crate::tenant::TenantId;

/// The tenant context for a single in-flight request.
///
/// Downstream components read the resolved tenant id from this context when
/// no explicit tenant id is supplied. The `superadmin_override` flag is set
/// only after a superadmin principal's cross-tenant access has been
/// validated and audited; it is informational for logging and audit
/// purposes and does not weaken filter enforcement.
#[derive(Debug, Clone)]
pub struct RequestTenantContext {
    tenant_id: TenantId,
    superadmin_override: bool,
    correlation_id: Option<String>,
}

impl RequestTenantContext {
    /// Creates a context for the given resolved tenant.
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            superadmin_override: false,
            correlation_id: None,
        }
    }

    /// Returns a copy of this context flagged as a validated superadmin
    /// cross-tenant override.
    pub fn with_superadmin_override(mut self) -> Self {
        self.superadmin_override = true;
        self
    }

    /// Attaches a correlation id for request tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Returns the resolved tenant id.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns `true` if a superadmin cross-tenant override was validated
    /// for this request.
    pub fn is_superadmin_override(&self) -> bool {
        self.superadmin_override
    }

    /// Returns the correlation id, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}
