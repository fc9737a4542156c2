use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};

use super::error::AuthError;
use super::extractor::Principal;
use super::state::AuthState;
use crate::directory::Directory;
use crate::store::TtlStore;
use crate::types::{ADMIN_PERMISSION, ANY_AUTHENTICATED};

/// Route guard that checks the resolved permission set against a required
/// list, with OR semantics: one match is enough.
///
/// Checked in order: the `"admin"` superuser bypass, then the `"all"`
/// sentinel (any authenticated principal), then the intersection. Denies
/// with `403`; a request that never passed the gateway gets `401`.
///
/// Layer it *inside* the gateway so the principal is already attached:
///
/// ```rust,ignore
/// Router::new()
///     .route("/users", get(list_users))
///     .route_layer(PermissionGate::new(state.clone(), &["manage_users"]))
///     .layer(middleware::from_fn_with_state(state, authenticate::<D, S>));
/// ```
pub struct PermissionGate<D, S> {
    state: AuthState<D, S>,
    required: &'static [&'static str],
}

impl<D, S> PermissionGate<D, S> {
    #[must_use]
    pub fn new(state: AuthState<D, S>, required: &'static [&'static str]) -> Self {
        Self { state, required }
    }
}

// Manual Clone: avoid derive adding a `D: Clone` bound.
impl<D, S: Clone> Clone for PermissionGate<D, S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            required: self.required,
        }
    }
}

impl<Inner, D, S: Clone> Layer<Inner> for PermissionGate<D, S> {
    type Service = PermissionGateService<Inner, D, S>;

    fn layer(&self, inner: Inner) -> Self::Service {
        PermissionGateService {
            inner,
            state: self.state.clone(),
            required: self.required,
        }
    }
}

pub struct PermissionGateService<Inner, D, S> {
    inner: Inner,
    state: AuthState<D, S>,
    required: &'static [&'static str],
}

impl<Inner: Clone, D, S: Clone> Clone for PermissionGateService<Inner, D, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            state: self.state.clone(),
            required: self.required,
        }
    }
}

impl<Inner, D, S> Service<Request> for PermissionGateService<Inner, D, S>
where
    Inner: Service<Request, Response = Response, Error = std::convert::Infallible>
        + Clone
        + Send
        + 'static,
    Inner::Future: Send,
    D: Directory,
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
        // Take the service that was polled ready; leave the clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();
        let required = self.required;

        Box::pin(async move {
            let Some(principal) = request.extensions().get::<Principal>().cloned() else {
                return Ok(AuthError::Unauthenticated.into_response());
            };

            if satisfies(&principal.permissions, required) {
                return inner.call(request).await;
            }

            // An empty resolved set may mean resolution never ran (or a
            // stale cache emptied it); check the Directory once before
            // denying.
            if principal.permissions.is_empty() {
                match state.resolver.reload(state.directory.as_ref(), principal.id).await {
                    Ok(fresh) if satisfies(&fresh, required) => {
                        return inner.call(request).await;
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::error!(error = %error, principal = %principal.id, "directory fallback failed during authorization");
                    }
                }
            }

            tracing::debug!(principal = %principal.id, ?required, "authorization denied");
            Ok(AuthError::Forbidden.into_response())
        })
    }
}

/// Core authorization decision. Admin bypass first, then the
/// any-authenticated sentinel, then OR-intersection.
fn satisfies(permissions: &HashSet<String>, required: &[&str]) -> bool {
    if permissions.contains(ADMIN_PERMISSION) {
        return true;
    }
    if required.iter().any(|r| *r == ANY_AUTHENTICATED) {
        return true;
    }
    required.iter().any(|r| permissions.contains(*r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(perms: &[&str]) -> HashSet<String> {
        perms.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn admin_bypasses_any_requirement() {
        assert!(satisfies(&set(&["admin"]), &["manage_users"]));
        assert!(satisfies(&set(&["admin"]), &["nonexistent_permission"]));
        assert!(satisfies(&set(&["admin", "read"]), &[]));
    }

    #[test]
    fn all_sentinel_accepts_any_authenticated_principal() {
        assert!(satisfies(&set(&["read"]), &["all"]));
        assert!(satisfies(&set(&[]), &["all"]));
    }

    #[test]
    fn one_match_is_sufficient() {
        assert!(satisfies(&set(&["read"]), &["write", "read"]));
    }

    #[test]
    fn no_match_is_denied() {
        assert!(!satisfies(&set(&["read"]), &["write"]));
        assert!(!satisfies(&set(&[]), &["write"]));
        assert!(!satisfies(&set(&["read"]), &[]));
    }
}
