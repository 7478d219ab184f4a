//! Bearer-token authentication and the per-request auth context.
//!
//! Construction is two-phase: the cheap [`AuthContext`] (decoded claims +
//! revocation + tenant match) is built once per request for fast checks;
//! the full user-with-roles principal is loaded lazily only when a handler
//! asks for it.

mod builder;
mod claims;
mod context;
mod revocation;

pub use builder::AuthContextBuilder;
pub use claims::{AccessClaims, TokenDecoder};
pub use context::{AccessLevel, AuthContext, Principal, PrincipalDirectory, PrincipalError};
pub use revocation::{
    RevocationCheck, RevocationStore, RevocationStoreError, StaticRevocationList,
    check_revocation,
};

use thiserror::Error;

use tessera_tenancy::tenant::TenantId;

/// Authentication and tenant-match failures.
///
/// `TenantMismatch` and `InsufficientAccess` are 403-class (valid token,
/// not allowed); everything else is 401-class.
#[derive(Error, Debug)]
pub enum AuthError {
    /// No bearer token on the request.
    #[error("missing bearer token")]
    MissingToken,

    /// The token failed signature or structural validation.
    #[error("invalid token")]
    TokenInvalid {
        /// Decoder detail; logged, not returned to clients verbatim.
        reason: String,
    },

    /// The token is expired.
    #[error("token expired")]
    TokenExpired,

    /// The token's unique id is revoked.
    #[error("token revoked")]
    TokenRevoked,

    /// The token was issued for a different tenant than the request
    /// resolved to, and the principal is not a superadmin.
    #[error("token tenant {token_tenant} does not match request tenant {request_tenant}")]
    TenantMismatch {
        token_tenant: TenantId,
        request_tenant: TenantId,
    },

    /// The principal's access level is below the handler's requirement.
    #[error("access level {actual} is below required level {required}")]
    InsufficientAccess { required: u8, actual: u8 },
}
