use std::collections::HashSet;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AuthError;
use crate::types::{PrincipalId, ADMIN_PERMISSION};

/// The authenticated caller, attached to the request by the gateway.
///
/// This is a strongly typed request-extension value (not a string-keyed
/// context entry): handlers and guards read the same immutable snapshot
/// that the gateway attached exactly once. The permission set is derived
/// per request and never persisted.
///
/// Use as an extractor in route handlers; rejects with `401 Unauthorized`
/// when the gateway did not authenticate the request.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(principal: Principal) -> impl IntoResponse {
///     format!("{} can {:?}", principal.id, principal.permissions)
/// }
///
/// // Optional: route serving both authenticated and anonymous callers
/// async fn feed(principal: Option<Principal>) -> impl IntoResponse { /* … */ }
/// ```
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    /// Deduplicated union of permission names over the caller's roles.
    /// Unordered; never rely on iteration order.
    pub permissions: HashSet<String>,
}

impl Principal {
    /// Whether the caller holds the superuser sentinel.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.permissions.contains(ADMIN_PERMISSION)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
