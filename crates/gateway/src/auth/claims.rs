//! Access token claims and decoding.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Claims carried by a Tessera access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The principal's user id.
    pub sub: String,
    /// Unique token id, used for revocation lookup.
    pub jti: String,
    /// The tenant the token was issued for.
    pub tenant_id: String,
    /// Role level granted at token issuance.
    #[serde(default)]
    pub access_level: u8,
    /// Whether the principal may cross tenant boundaries.
    #[serde(default)]
    pub is_super_admin: bool,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Issued-at, seconds since epoch.
    #[serde(default)]
    pub iat: i64,
}

/// Validates and decodes bearer tokens.
pub struct TokenDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDecoder").finish_non_exhaustive()
    }
}

impl TokenDecoder {
    /// Creates a decoder for HS256 tokens signed with the given secret.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Decodes a token, validating signature and expiry.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, AuthError> {
        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid {
                    reason: err.to_string(),
                },
            })
    }
}
