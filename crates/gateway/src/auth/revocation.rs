//! Token revocation checking.
//!
//! The revocation store is an external fast-lookup collaborator keyed by
//! the token's unique id. The check sits on every request's critical path,
//! so it runs under a short timeout, and it is the one deliberate
//! fail-soft exception in this subsystem: a store failure or timeout is
//! treated as "not revoked" and logged, never propagated as a hard
//! failure. That policy is visible in the [`RevocationCheck`] tri-state
//! rather than buried in error handling.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Outcome of a revocation lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationCheck {
    /// The token id is on the revocation list; refuse the request.
    Revoked,
    /// The token id is not on the revocation list.
    NotRevoked,
    /// The store failed or timed out; availability wins and the caller
    /// proceeds as if not revoked.
    CheckUnavailable,
}

/// Failure reported by a revocation store implementation.
#[derive(Error, Debug)]
#[error("revocation store failure: {0}")]
pub struct RevocationStoreError(pub String);

/// Fast lookup of revoked token ids.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Returns whether the given token id is revoked.
    async fn is_token_revoked(&self, jti: &str) -> Result<bool, RevocationStoreError>;
}

/// Runs the revocation lookup under the given timeout, folding failures
/// into [`RevocationCheck::CheckUnavailable`].
pub async fn check_revocation(
    store: &dyn RevocationStore,
    jti: &str,
    timeout: Duration,
) -> RevocationCheck {
    match tokio::time::timeout(timeout, store.is_token_revoked(jti)).await {
        Ok(Ok(true)) => RevocationCheck::Revoked,
        Ok(Ok(false)) => RevocationCheck::NotRevoked,
        Ok(Err(err)) => {
            warn!(error = %err, "revocation store failed; treating token as not revoked");
            RevocationCheck::CheckUnavailable
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "revocation check timed out; treating token as not revoked"
            );
            RevocationCheck::CheckUnavailable
        }
    }
}

/// In-memory revocation list for development and tests.
#[derive(Debug, Default)]
pub struct StaticRevocationList {
    jtis: HashSet<String>,
}

impl StaticRevocationList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a revoked token id.
    pub fn with_revoked(mut self, jti: impl Into<String>) -> Self {
        self.jtis.insert(jti.into());
        self
    }
}

#[async_trait]
impl RevocationStore for StaticRevocationList {
    async fn is_token_revoked(&self, jti: &str) -> Result<bool, RevocationStoreError> {
        Ok(self.jtis.contains(jti))
    }
}
