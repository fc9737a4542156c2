use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use tokio::time::timeout;

use super::cookies;
use super::error::AuthError;
use super::extractor::Principal;
use super::state::AuthState;
use crate::directory::Directory;
use crate::error::Error;
use crate::store::TtlStore;
use crate::token::TokenKind;
use crate::types::User;

/// Per-request authentication middleware.
///
/// Verifies the access cookie, falls back to the refresh protocol when the
/// access token is absent or expired, resolves the caller's permission set,
/// and attaches a [`Principal`] to the request — exactly once, immutable
/// afterward. Mount with `axum::middleware::from_fn_with_state`:
///
/// ```rust,ignore
/// let app = protected_routes
///     .layer(middleware::from_fn_with_state(state.clone(), authenticate::<MyDir, MyStore>));
/// ```
///
/// An access token that fails verification for any reason other than
/// expiry is rejected outright without attempting a refresh: an
/// invalid-but-unexpired token signals tampering, not staleness.
pub async fn authenticate<D, S>(
    State(state): State<AuthState<D, S>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    D: Directory,
    S: TtlStore + Clone,
{
    let access = jar
        .get(&state.config.access_cookie_name)
        .map(|c| c.value().to_string());

    let Some(access) = access else {
        return refresh_session(&state, jar, request, next).await;
    };

    match state.codec.verify_access(&access) {
        Ok(claims) => {
            if state.revocation.is_revoked(TokenKind::Access, &access).await {
                tracing::debug!(principal = %claims.sub, "revoked access token presented");
                return Err(Error::RevokedToken.into());
            }

            let permissions = state
                .resolver
                .resolve(state.directory.as_ref(), claims.sub, &claims.role_ids)
                .await?;

            let principal = Principal {
                id: claims.sub,
                email: claims.email,
                permissions,
            };
            Ok(run_authenticated(principal, request, next).await)
        }
        Err(Error::ExpiredToken) => refresh_session(&state, jar, request, next).await,
        Err(_) => Err(AuthError::Unauthenticated),
    }
}

/// The refresh protocol: validate the refresh cookie, rotate the pair,
/// and re-resolve permissions from a fresh Directory load.
///
/// The superseded refresh token is blacklisted for its remaining lifetime
/// before the new cookies go out, so rotation actually retires it.
async fn refresh_session<D, S>(
    state: &AuthState<D, S>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    D: Directory,
    S: TtlStore + Clone,
{
    let refresh = jar
        .get(&state.config.refresh_cookie_name)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::Unauthenticated)?;

    if state.revocation.is_revoked(TokenKind::Refresh, &refresh).await {
        tracing::debug!("revoked refresh token presented");
        return Err(Error::RevokedToken.into());
    }

    let claims = state
        .codec
        .verify_refresh(&refresh)
        .map_err(|_| AuthError::Unauthenticated)?;

    let user = load_user(state, claims.sub).await?.ok_or(AuthError::Unauthenticated)?;

    let pair = state.codec.issue_pair(&user)?;

    if let Err(error) = state
        .revocation
        .revoke(TokenKind::Refresh, &refresh, claims.remaining_ttl())
        .await
    {
        tracing::warn!(error = %error, principal = %user.id, "failed to retire superseded refresh token");
    }

    let permissions = state.resolver.populate(&user.roles).await;

    let jar = jar
        .add(cookies::access_cookie(&state.config, &pair.access_token))
        .add(cookies::refresh_cookie(&state.config, &pair.refresh_token));

    let principal = Principal {
        id: user.id,
        email: user.email,
        permissions,
    };
    tracing::debug!(principal = %principal.id, "session refreshed");

    let response = run_authenticated(principal, request, next).await;
    Ok((jar, response).into_response())
}

async fn run_authenticated(principal: Principal, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(principal);
    next.run(request).await
}

pub(super) async fn load_user<D, S>(
    state: &AuthState<D, S>,
    id: crate::types::PrincipalId,
) -> Result<Option<User>, AuthError>
where
    D: Directory,
    S: TtlStore + Clone,
{
    timeout(state.config.backend_timeout, state.directory.user_by_id(id))
        .await
        .map_err(|elapsed| AuthError::Internal(Error::Directory(Box::new(elapsed))))?
        .map_err(|error| AuthError::Internal(Error::Directory(error)))
}
