use std::time::Duration;

use tokio::time::timeout;

use crate::store::TtlStore;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Count observed in the current window, including this hit when allowed.
    pub count: i64,
}

/// TTL-windowed counters keyed by `(action, principal)`.
///
/// Check-then-increment: a request is rejected once the current count
/// reaches the maximum, otherwise the counter is bumped. The window TTL is
/// armed only on the key-absent → key-present transition; re-arming it on
/// every increment would keep a saturated window open forever under
/// sustained load.
///
/// Counters reset only via TTL expiry, never by explicit decrement.
/// Backend failures and timeouts degrade fail-open with a warning — rate
/// limiting is defense in depth, not a correctness requirement. A counter
/// whose window cannot be armed is dropped rather than left to live
/// forever, since an immortal counter would deny every request once
/// saturated.
#[derive(Debug, Clone)]
pub struct RateLimiter<S> {
    store: S,
    backend_timeout: Duration,
}

impl<S: TtlStore> RateLimiter<S> {
    pub fn new(store: S, backend_timeout: Duration) -> Self {
        Self {
            store,
            backend_timeout,
        }
    }

    /// Record a hit for `principal` under `action` and decide whether it is
    /// within `max_attempts` for the current `window`.
    pub async fn allow(
        &self,
        action: &str,
        principal: &str,
        window: Duration,
        max_attempts: i64,
    ) -> Decision {
        let key = format!("{action}_rate:{principal}");

        let current = match timeout(self.backend_timeout, self.store.get(&key)).await {
            Ok(Ok(Some(raw))) => raw.parse::<i64>().unwrap_or(0),
            Ok(Ok(None)) => 0,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, action, "rate-limit read failed; allowing (fail-open)");
                return Decision { allowed: true, count: 0 };
            }
            Err(_) => {
                tracing::warn!(action, "rate-limit read timed out; allowing (fail-open)");
                return Decision { allowed: true, count: 0 };
            }
        };

        if current >= max_attempts {
            return Decision { allowed: false, count: current };
        }

        // Atomic at the backend; a read-modify-write pair would lose
        // updates under concurrent hits from the same principal.
        let count = match timeout(self.backend_timeout, self.store.incr(&key)).await {
            Ok(Ok(count)) => count,
            Ok(Err(error)) => {
                tracing::warn!(error = %error, action, "rate-limit increment failed; allowing (fail-open)");
                return Decision { allowed: true, count: current };
            }
            Err(_) => {
                tracing::warn!(action, "rate-limit increment timed out; allowing (fail-open)");
                return Decision { allowed: true, count: current };
            }
        };

        if count == 1 && !self.arm_window(&key, window).await {
            // The counter has no TTL and would never reset. Forfeit this
            // window so the principal is not denied forever.
            tracing::warn!(action, "failed to arm rate-limit window; dropping counter");
            match timeout(self.backend_timeout, self.store.delete(&key)).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, action, "failed to drop unarmed rate-limit counter");
                }
                Err(_) => {
                    tracing::warn!(action, "dropping unarmed rate-limit counter timed out");
                }
            }
        }

        Decision { allowed: true, count }
    }

    async fn arm_window(&self, key: &str, window: Duration) -> bool {
        matches!(
            timeout(self.backend_timeout, self.store.expire(key, window)).await,
            Ok(Ok(()))
        )
    }
}
