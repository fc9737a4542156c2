use std::sync::Arc;

use super::config::AuthConfig;
use crate::directory::Directory;
use crate::permissions::PermissionResolver;
use crate::rate_limit::RateLimiter;
use crate::revocation::RevocationRegistry;
use crate::store::TtlStore;
use crate::token::TokenCodec;

/// Shared state for the gateway, guards, and auth routes.
///
/// Every collaborator is an explicit dependency wired here — no process
/// globals — so tests can substitute a fake Directory or an in-memory
/// store.
pub struct AuthState<D, S> {
    pub(crate) directory: Arc<D>,
    pub(crate) codec: Arc<TokenCodec>,
    pub(crate) revocation: RevocationRegistry<S>,
    pub(crate) resolver: PermissionResolver<S>,
    pub(crate) limiter: RateLimiter<S>,
    pub(crate) config: Arc<AuthConfig>,
}

impl<D: Directory, S: TtlStore + Clone> AuthState<D, S> {
    pub fn new(config: AuthConfig, directory: D, store: S) -> Self {
        let codec = TokenCodec::new(
            config.secret.as_bytes(),
            config.access_ttl,
            config.refresh_ttl,
        );
        Self {
            directory: Arc::new(directory),
            codec: Arc::new(codec),
            revocation: RevocationRegistry::new(store.clone(), config.backend_timeout),
            resolver: PermissionResolver::new(
                store.clone(),
                config.permission_ttl,
                config.backend_timeout,
            ),
            limiter: RateLimiter::new(store, config.backend_timeout),
            config: Arc::new(config),
        }
    }

    /// The token codec, for consumers that need raw pairs (e.g. a mobile
    /// API returning tokens in a JSON body instead of cookies).
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// A handle to the rate limiter, as used by [`Throttle`](super::Throttle).
    #[must_use]
    pub fn limiter(&self) -> RateLimiter<S> {
        self.limiter.clone()
    }
}

// Manual Clone: avoid derive adding a `D: Clone` bound.
impl<D, S: Clone> Clone for AuthState<D, S> {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            codec: self.codec.clone(),
            revocation: self.revocation.clone(),
            resolver: self.resolver.clone(),
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }
    }
}
