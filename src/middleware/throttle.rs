use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use super::error::AuthError;
use super::extractor::Principal;
use crate::rate_limit::RateLimiter;
use crate::store::TtlStore;

/// Rate-limiting layer keyed by `(action, principal-or-IP)`.
///
/// Authenticated requests count per principal id; anonymous ones per
/// client IP (`x-forwarded-for` / `x-real-ip`). Exhaustion answers `429`.
/// Reference windows: 1 minute for read-ish actions, 1 hour for sensitive
/// admin mutations.
///
/// ```rust,ignore
/// Router::new()
///     .route("/users", delete(remove_user))
///     .route_layer(Throttle::new(state.limiter(), "delete_user", Duration::from_secs(3600), 10))
///     .layer(middleware::from_fn_with_state(state, authenticate::<D, S>));
/// ```
pub struct Throttle<S> {
    limiter: RateLimiter<S>,
    action: &'static str,
    window: Duration,
    max_attempts: i64,
}

impl<S> Throttle<S> {
    #[must_use]
    pub fn new(
        limiter: RateLimiter<S>,
        action: &'static str,
        window: Duration,
        max_attempts: i64,
    ) -> Self {
        Self {
            limiter,
            action,
            window,
            max_attempts,
        }
    }
}

impl<S: Clone> Clone for Throttle<S> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            action: self.action,
            window: self.window,
            max_attempts: self.max_attempts,
        }
    }
}

impl<Inner, S: Clone> Layer<Inner> for Throttle<S> {
    type Service = ThrottleService<Inner, S>;

    fn layer(&self, inner: Inner) -> Self::Service {
        ThrottleService {
            inner,
            limiter: self.limiter.clone(),
            action: self.action,
            window: self.window,
            max_attempts: self.max_attempts,
        }
    }
}

pub struct ThrottleService<Inner, S> {
    inner: Inner,
    limiter: RateLimiter<S>,
    action: &'static str,
    window: Duration,
    max_attempts: i64,
}

impl<Inner: Clone, S: Clone> Clone for ThrottleService<Inner, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            action: self.action,
            window: self.window,
            max_attempts: self.max_attempts,
        }
    }
}

impl<Inner, S> Service<Request> for ThrottleService<Inner, S>
where
    Inner: Service<Request, Response = Response, Error = std::convert::Infallible>
        + Clone
        + Send
        + 'static,
    Inner::Future: Send,
    S: TtlStore + Clone,
{
    type Response = Response;
    type Error = std::convert::Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Response, std::convert::Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limiter = self.limiter.clone();
        let action = self.action;
        let window = self.window;
        let max_attempts = self.max_attempts;

        Box::pin(async move {
            let key = request
                .extensions()
                .get::<Principal>()
                .map(|p| p.id.to_string())
                .or_else(|| client_ip(request.headers()))
                .unwrap_or_else(|| "anonymous".to_string());

            let decision = limiter.allow(action, &key, window, max_attempts).await;
            if !decision.allowed {
                tracing::warn!(action, key = %key, count = decision.count, "rate limit exceeded");
                return Ok(AuthError::RateLimited.into_response());
            }

            inner.call(request).await
        })
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}
