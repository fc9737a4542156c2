use std::future::Future;

use crate::error::BoxError;
use crate::types::{PrincipalId, Role, User};

/// Consumer-provided authoritative source of users, roles, and
/// role→permission assignments (typically the relational store).
///
/// Both operations must preload their associations in a single round trip —
/// the permission-resolution protocol assumes one joined fetch, not a query
/// per role.
///
/// Permission names are identifiers like `manage_users`, not free text.
/// They are cached comma-joined per role, so a name containing a comma
/// would be split into two on the way back out of the cache. Enforce this
/// at the schema level (it matches the usual `CHECK`/validation on
/// permission slugs).
///
/// # Example
///
/// ```rust,ignore
/// impl Directory for MyAppState {
///     async fn user_by_id(&self, id: PrincipalId) -> Result<Option<User>, BoxError> {
///         self.repo.user_with_roles(id.0).await
///     }
///
///     async fn roles_and_permissions_for_user(
///         &self,
///         id: PrincipalId,
///     ) -> Result<Vec<Role>, BoxError> {
///         self.repo.roles_with_permissions(id.0).await
///     }
/// }
/// ```
pub trait Directory: Send + Sync + 'static {
    /// Fetch a user with roles preloaded. `Ok(None)` means the principal
    /// no longer exists (deleted account with a still-live refresh token).
    fn user_by_id(
        &self,
        id: PrincipalId,
    ) -> impl Future<Output = Result<Option<User>, BoxError>> + Send;

    /// Fetch the principal's roles with permission names preloaded,
    /// in one round trip.
    fn roles_and_permissions_for_user(
        &self,
        id: PrincipalId,
    ) -> impl Future<Output = Result<Vec<Role>, BoxError>> + Send;
}
