use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Error;
use crate::types::{PrincipalId, RoleId, User};

const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Which half of the session pair a token value belongs to.
///
/// Used as the namespace component of revocation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => TOKEN_TYPE_ACCESS,
            Self::Refresh => TOKEN_TYPE_REFRESH,
        }
    }
}

/// Claims embedded in an access token.
///
/// Carries the role ids needed for permission resolution so the common
/// path never touches the Directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: PrincipalId,
    pub email: String,
    pub roles: Vec<String>,
    pub role_ids: Vec<RoleId>,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

/// Claims embedded in a refresh token.
///
/// Deliberately carries no role or permission data — roles are reloaded
/// from the Directory on every refresh so a rotation always reflects the
/// current assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: PrincipalId,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

impl AccessClaims {
    /// Time until natural expiry, zero if already past.
    #[must_use]
    pub fn remaining_ttl(&self) -> Duration {
        remaining(self.exp)
    }
}

impl RefreshClaims {
    /// Time until natural expiry, zero if already past.
    #[must_use]
    pub fn remaining_ttl(&self) -> Duration {
        remaining(self.exp)
    }
}

fn remaining(exp: i64) -> Duration {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    Duration::from_secs(exp.saturating_sub(now).max(0) as u64)
}

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies session tokens with a server-held HMAC secret.
///
/// The algorithm is pinned to HS256: the token header is checked on every
/// verification, so an attacker cannot downgrade to `none` or smuggle a
/// different family in (algorithm-confusion).
///
/// Verification is pure — revocation is the gateway's concern, which keeps
/// this type testable in isolation.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue an access token for `user`, with a fresh unique `jti`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] on signing-backend failure.
    pub fn issue_access(&self, user: &User) -> Result<String, Error> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            roles: user.role_names(),
            role_ids: user.role_ids(),
            iat: now,
            exp: now + self.access_ttl.as_secs() as i64,
            jti: Uuid::new_v4().to_string(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Issue a refresh token for `principal`, with a fresh unique `jti`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] on signing-backend failure.
    pub fn issue_refresh(&self, principal: PrincipalId) -> Result<String, Error> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = RefreshClaims {
            sub: principal,
            iat: now,
            exp: now + self.refresh_ttl.as_secs() as i64,
            jti: Uuid::new_v4().to_string(),
            token_type: TOKEN_TYPE_REFRESH.to_string(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Issue both halves of a session pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] on signing-backend failure.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, Error> {
        Ok(TokenPair {
            access_token: self.issue_access(user)?,
            refresh_token: self.issue_refresh(user.id)?,
        })
    }

    /// Verify an access token.
    ///
    /// # Errors
    ///
    /// [`Error::ExpiredToken`] for a structurally valid token past its
    /// expiry; [`Error::InvalidToken`] for anything else (bad signature,
    /// wrong algorithm, malformed claims, wrong token type).
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, Error> {
        let data = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(map_verify_error)?;
        if data.claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(Error::InvalidToken);
        }
        Ok(data.claims)
    }

    /// Verify a refresh token.
    ///
    /// # Errors
    ///
    /// Same contract as [`verify_access`](Self::verify_access).
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, Error> {
        let data = jsonwebtoken::decode::<RefreshClaims>(token, &self.decoding, &self.validation)
            .map_err(map_verify_error)?;
        if data.claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(Error::InvalidToken);
        }
        Ok(data.claims)
    }
}

fn map_verify_error(err: jsonwebtoken::errors::Error) -> Error {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => Error::ExpiredToken,
        _ => Error::InvalidToken,
    }
}
