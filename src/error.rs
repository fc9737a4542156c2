/// Boxed error type used by the consumer-implemented backend traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error taxonomy for the authentication subsystem.
///
/// The variants map onto distinct recovery paths: `ExpiredToken` is
/// recoverable via refresh, `Cache` always degrades to a Directory read,
/// `Directory` is fatal to the request but safe for the client to retry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed, unsigned, wrong-algorithm, or otherwise tampered token.
    #[error("invalid token")]
    InvalidToken,

    /// Structurally valid token past its expiry.
    #[error("expired token")]
    ExpiredToken,

    /// Token explicitly blacklisted before its natural expiry.
    #[error("revoked token")]
    RevokedToken,

    /// The authoritative user/role store failed or timed out.
    #[error("directory unavailable: {0}")]
    Directory(BoxError),

    /// The shared TTL cache backend failed or timed out.
    #[error("cache unavailable: {0}")]
    Cache(BoxError),

    /// Signing-backend failure during token issuance.
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
