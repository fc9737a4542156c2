#![doc = include_str!("../README.md")]

pub mod directory;
pub mod error;
pub mod middleware;
pub mod permissions;
pub mod rate_limit;
pub mod revocation;
pub mod store;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use directory::Directory;
pub use error::{BoxError, Error};
pub use middleware::{
    auth_routes, authenticate, establish_session, AuthConfig, AuthError, AuthState,
    PermissionGate, Principal, Throttle,
};
pub use permissions::PermissionResolver;
pub use rate_limit::{Decision, RateLimiter};
pub use revocation::RevocationRegistry;
pub use store::{MemoryStore, TtlStore};
pub use token::{AccessClaims, RefreshClaims, TokenCodec, TokenKind, TokenPair};
pub use types::{PrincipalId, Role, RoleId, User, ADMIN_PERMISSION, ANY_AUTHENTICATED};
