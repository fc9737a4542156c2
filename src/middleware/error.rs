use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::Error;

/// Request-facing authentication/authorization errors.
///
/// The response bodies are a stable code/message pair and never carry
/// internal detail — backend names and causes go to the log, not the
/// client.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing, invalid, expired, or revoked credentials, or a failed
    /// refresh. The client should log in again.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated, but the permission set does not satisfy the route.
    #[error("insufficient permissions")]
    Forbidden,

    /// Rate-limit window exhausted for this principal.
    #[error("too many requests")]
    RateLimited,

    /// Directory or signing failure during otherwise-successful
    /// authentication. Transient — safe for the client to retry.
    #[error("internal error")]
    Internal(#[source] Error),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(ref source) => {
                tracing::error!(error = %self, source = %source, "auth internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "auth configuration error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<Error> for AuthError {
    fn from(error: Error) -> Self {
        match error {
            Error::InvalidToken | Error::ExpiredToken | Error::RevokedToken => {
                Self::Unauthenticated
            }
            error @ (Error::Directory(_) | Error::Cache(_) | Error::Signing(_)) => {
                Self::Internal(error)
            }
        }
    }
}
