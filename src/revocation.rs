use std::time::Duration;

use tokio::time::timeout;

use crate::store::TtlStore;
use crate::token::TokenKind;

fn blacklist_key(kind: TokenKind, token: &str) -> String {
    format!("blacklist:{}:{}", kind.as_str(), token)
}

/// Records tokens that must no longer be honored even though they are
/// structurally valid and unexpired.
///
/// Entries are keyed per token value and carry the token's remaining
/// lifetime as their TTL, so a marker never outlives the token it shadows.
/// Normal expiry never creates an entry — that is handled by verification.
///
/// Revoking one token does not affect sibling tokens issued to the same
/// principal; there is no "revoke all sessions for user X" operation.
#[derive(Debug, Clone)]
pub struct RevocationRegistry<S> {
    store: S,
    backend_timeout: Duration,
}

impl<S: TtlStore> RevocationRegistry<S> {
    pub fn new(store: S, backend_timeout: Duration) -> Self {
        Self {
            store,
            backend_timeout,
        }
    }

    /// Blacklist a token for the rest of its lifetime. Idempotent: a second
    /// call simply overwrites the marker and its TTL.
    ///
    /// A zero `remaining_ttl` is a no-op — the token is already dead.
    ///
    /// # Errors
    ///
    /// Returns the backend error; callers on the write path (logout,
    /// rotation) decide whether to absorb it.
    pub async fn revoke(
        &self,
        kind: TokenKind,
        token: &str,
        remaining_ttl: Duration,
    ) -> Result<(), crate::Error> {
        if remaining_ttl.is_zero() {
            return Ok(());
        }
        timeout(
            self.backend_timeout,
            self.store
                .put(&blacklist_key(kind, token), "revoked", remaining_ttl),
        )
        .await
        .map_err(|elapsed| crate::Error::Cache(Box::new(elapsed)))?
        .map_err(crate::Error::Cache)
    }

    /// Whether a token has been blacklisted.
    ///
    /// Backend failures and timeouts degrade fail-open with a logged
    /// warning: an unreachable registry must not take authentication down
    /// with it.
    pub async fn is_revoked(&self, kind: TokenKind, token: &str) -> bool {
        match timeout(self.backend_timeout, self.store.get(&blacklist_key(kind, token))).await {
            Ok(Ok(marker)) => marker.is_some(),
            Ok(Err(error)) => {
                tracing::warn!(
                    error = %error,
                    kind = kind.as_str(),
                    "revocation check failed; honoring token (fail-open)"
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    kind = kind.as_str(),
                    "revocation check timed out; honoring token (fail-open)"
                );
                false
            }
        }
    }
}
