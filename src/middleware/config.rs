use std::time::Duration;

use super::error::AuthError;

/// Authentication configuration.
///
/// The signing secret is a constructor parameter — no runtime
/// "missing field" errors. Everything else defaults to one coherent TTL
/// policy: access tokens 15 minutes, refresh tokens 7 days (the lifetime
/// asymmetry the refresh protocol depends on), permission cache 5 minutes
/// so role-assignment changes converge quickly.
///
/// Use [`from_env()`](AuthConfig::from_env) for convention-based setup, or
/// [`new()`](AuthConfig::new) with `with_*` methods for full control.
pub struct AuthConfig {
    pub(crate) secret: String,
    pub(crate) access_ttl: Duration,
    pub(crate) refresh_ttl: Duration,
    pub(crate) permission_ttl: Duration,
    pub(crate) backend_timeout: Duration,
    pub(crate) access_cookie_name: String,
    pub(crate) refresh_cookie_name: String,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
}

impl AuthConfig {
    /// Create a config with the required signing secret and default policy.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            permission_ttl: Duration::from_secs(5 * 60),
            backend_timeout: Duration::from_secs(2),
            access_cookie_name: "access_token".into(),
            refresh_cookie_name: "refresh_token".into(),
            secure_cookies: true,
            auth_path: "/auth".into(),
        }
    }

    /// Create a config from environment variables.
    ///
    /// # Required env vars
    /// - `GATEHOUSE_TOKEN_SECRET`: HMAC signing secret
    ///
    /// # Optional env vars
    /// - `GATEHOUSE_ACCESS_TTL_SECS`, `GATEHOUSE_REFRESH_TTL_SECS`,
    ///   `GATEHOUSE_PERMISSION_TTL_SECS`: TTL overrides in seconds
    /// - `GATEHOUSE_BACKEND_TIMEOUT_MS`: per-call backend deadline
    /// - `GATEHOUSE_INSECURE_COOKIES`: `"1"` or `"true"` drops the `Secure`
    ///   cookie flag for plain-HTTP development
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the secret is missing or a numeric
    /// override fails to parse.
    pub fn from_env() -> Result<Self, AuthError> {
        let secret = std::env::var("GATEHOUSE_TOKEN_SECRET")
            .map_err(|_| AuthError::Config("GATEHOUSE_TOKEN_SECRET is required".into()))?;

        let mut config = Self::new(secret);

        if let Some(secs) = env_u64("GATEHOUSE_ACCESS_TTL_SECS")? {
            config.access_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("GATEHOUSE_REFRESH_TTL_SECS")? {
            config.refresh_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("GATEHOUSE_PERMISSION_TTL_SECS")? {
            config.permission_ttl = Duration::from_secs(secs);
        }
        if let Some(millis) = env_u64("GATEHOUSE_BACKEND_TIMEOUT_MS")? {
            config.backend_timeout = Duration::from_millis(millis);
        }

        let insecure = matches!(
            std::env::var("GATEHOUSE_INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true"),
        );
        config.secure_cookies = !insecure;

        Ok(config)
    }

    #[must_use]
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_permission_ttl(mut self, ttl: Duration) -> Self {
        self.permission_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_access_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.access_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_refresh_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.refresh_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_path = path.into();
        self
    }
}

fn env_u64(name: &str) -> Result<Option<u64>, AuthError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| AuthError::Config(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}
