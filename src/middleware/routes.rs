use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::CookieJar;

use super::cookies;
use super::error::AuthError;
use super::extractor::Principal;
use super::gateway;
use super::state::AuthState;
use crate::directory::Directory;
use crate::store::TtlStore;
use crate::token::TokenKind;
use crate::types::PrincipalId;

/// Session-lifecycle routes, currently `{auth_path}/logout`.
///
/// Logout blacklists both current tokens for their remaining lifetimes and
/// clears both cookies with a past expiry. Mount *outside* the gateway —
/// a client with an expired access token must still be able to log out.
pub fn auth_routes<D, S>(state: AuthState<D, S>) -> Router
where
    D: Directory,
    S: TtlStore + Clone,
{
    let auth_path = state.config.auth_path.clone();

    Router::new()
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<D, S>).post(logout::<D, S>),
        )
        .with_state(state)
}

async fn logout<D, S>(
    State(state): State<AuthState<D, S>>,
    jar: CookieJar,
) -> (CookieJar, StatusCode)
where
    D: Directory,
    S: TtlStore + Clone,
{
    if let Some(cookie) = jar.get(&state.config.access_cookie_name) {
        let token = cookie.value().to_string();
        // Only unexpired tokens need a blacklist entry; expiry already
        // covers the rest.
        if let Ok(claims) = state.codec.verify_access(&token) {
            if let Err(error) = state
                .revocation
                .revoke(TokenKind::Access, &token, claims.remaining_ttl())
                .await
            {
                tracing::warn!(error = %error, "failed to blacklist access token during logout");
            }
        }
    }

    if let Some(cookie) = jar.get(&state.config.refresh_cookie_name) {
        let token = cookie.value().to_string();
        if let Ok(claims) = state.codec.verify_refresh(&token) {
            if let Err(error) = state
                .revocation
                .revoke(TokenKind::Refresh, &token, claims.remaining_ttl())
                .await
            {
                tracing::warn!(error = %error, "failed to blacklist refresh token during logout");
            }
        }
    }

    let jar = jar
        .add(cookies::clear_cookie(&state.config.access_cookie_name))
        .add(cookies::clear_cookie(&state.config.refresh_cookie_name));

    (jar, StatusCode::NO_CONTENT)
}

/// Mint a fresh session for `principal` and return the updated cookie jar
/// plus the authenticated [`Principal`].
///
/// Credential checking is the consumer's job; call this from a login
/// handler after the password check passes. Roles come from a fresh
/// Directory load, and the permission cache is populated as a side effect.
///
/// # Errors
///
/// [`AuthError::Unauthenticated`] if the principal does not exist;
/// [`AuthError::Internal`] on Directory or signing failure.
///
/// # Example
///
/// ```rust,ignore
/// async fn login(State(app): State<App>, jar: CookieJar, Json(body): Json<LoginBody>)
///     -> Result<(CookieJar, StatusCode), AuthError>
/// {
///     let user_id = app.check_password(&body.email, &body.password).await?;
///     let (jar, _principal) = establish_session(&app.auth, jar, user_id).await?;
///     Ok((jar, StatusCode::NO_CONTENT))
/// }
/// ```
pub async fn establish_session<D, S>(
    state: &AuthState<D, S>,
    jar: CookieJar,
    principal: PrincipalId,
) -> Result<(CookieJar, Principal), AuthError>
where
    D: Directory,
    S: TtlStore + Clone,
{
    let user = gateway::load_user(state, principal)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    let pair = state.codec.issue_pair(&user)?;
    let permissions = state.resolver.populate(&user.roles).await;

    let jar = jar
        .add(cookies::access_cookie(&state.config, &pair.access_token))
        .add(cookies::refresh_cookie(&state.config, &pair.refresh_token));

    tracing::info!(principal = %user.id, "session established");

    Ok((
        jar,
        Principal {
            id: user.id,
            email: user.email,
            permissions,
        },
    ))
}
