//! The per-request authentication context.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;

use tessera_tenancy::tenant::TenantId;

use super::{AccessClaims, AuthError};

/// An ordered role level granted at token issuance.
///
/// Only the ordering matters to this layer: handlers state a minimum level
/// and [`AuthContext::require_access_level`] enforces it. Full role and
/// permission resolution belongs to the permission service behind
/// [`PrincipalDirectory`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccessLevel(u8);

impl AccessLevel {
    /// Creates a level from its raw value.
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// Returns the raw level value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The full user-with-roles object, loaded lazily.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    /// The user id.
    pub user_id: String,
    /// The tenant the user belongs to.
    pub tenant_id: TenantId,
    /// Resolved role names.
    pub roles: Vec<String>,
}

/// Failure to load a principal.
#[derive(Error, Debug)]
#[error("principal lookup failed: {0}")]
pub struct PrincipalError(pub String);

/// Role/permission resolution collaborator (black box).
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Loads the full principal for a user in a tenant.
    async fn load(&self, user_id: &str, tenant_id: &TenantId) -> Result<Principal, PrincipalError>;
}

/// The cheap per-request authentication context.
///
/// Built once per request from decoded claims plus the revocation check.
/// Carries only what fast checks need; the full principal is behind
/// [`AuthContext::principal`] and is loaded at most once.
#[derive(Clone)]
pub struct AuthContext {
    user_id: String,
    tenant_id: TenantId,
    access_level: AccessLevel,
    is_superadmin: bool,
    token_jti: String,
    principal: Arc<OnceCell<Principal>>,
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .field("access_level", &self.access_level)
            .field("is_superadmin", &self.is_superadmin)
            .finish_non_exhaustive()
    }
}

impl AuthContext {
    /// Builds the context from validated claims.
    pub(crate) fn from_claims(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: TenantId::new(claims.tenant_id),
            access_level: AccessLevel::new(claims.access_level),
            is_superadmin: claims.is_super_admin,
            token_jti: claims.jti,
            principal: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the principal's user id.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the tenant the token was issued for.
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Returns the granted access level.
    pub fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    /// Returns `true` if the principal may cross tenant boundaries.
    pub fn is_superadmin(&self) -> bool {
        self.is_superadmin
    }

    /// Returns the token's unique id.
    pub fn token_jti(&self) -> &str {
        &self.token_jti
    }

    /// Enforces a minimum access level.
    pub fn require_access_level(&self, required: AccessLevel) -> Result<(), AuthError> {
        if self.access_level >= required {
            Ok(())
        } else {
            Err(AuthError::InsufficientAccess {
                required: required.value(),
                actual: self.access_level.value(),
            })
        }
    }

    /// Returns the full principal, loading it on first use.
    pub async fn principal(
        &self,
        directory: &dyn PrincipalDirectory,
    ) -> Result<&Principal, PrincipalError> {
        self.principal
            .get_or_try_init(|| directory.load(&self.user_id, &self.tenant_id))
            .await
    }
}
