use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use super::config::AuthConfig;

/// Create the access-token cookie (short-lived).
pub(super) fn access_cookie(config: &AuthConfig, token: &str) -> Cookie<'static> {
    session_cookie(
        &config.access_cookie_name,
        token,
        Duration::seconds(config.access_ttl.as_secs() as i64),
        config.secure_cookies,
    )
}

/// Create the refresh-token cookie (long-lived).
pub(super) fn refresh_cookie(config: &AuthConfig, token: &str) -> Cookie<'static> {
    session_cookie(
        &config.refresh_cookie_name,
        token,
        Duration::seconds(config.refresh_ttl.as_secs() as i64),
        config.secure_cookies,
    )
}

fn session_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(max_age)
        .build()
}

/// Create a removal cookie: empty value, expiry in the past.
pub(super) fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}
