//! Plug-and-play authentication middleware for Axum.
//!
//! The consumer brings a [`Directory`](crate::Directory) (authoritative
//! user/role store) and a [`TtlStore`](crate::TtlStore) (shared TTL cache,
//! e.g. Redis); this module provides the request gateway, the permission
//! gate, rate limiting, and the session-lifecycle routes.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use axum::{middleware, routing::get, Router};
//! use gatehouse::middleware::{auth_routes, authenticate, AuthConfig, AuthState, PermissionGate};
//!
//! // 1. Implement Directory and TtlStore for your backends
//! let state = AuthState::new(AuthConfig::from_env()?, my_directory, my_store);
//!
//! // 2. Guard your routes
//! let app = Router::new()
//!     .route("/users", get(list_users))
//!     .route_layer(PermissionGate::new(state.clone(), &["manage_users"]))
//!     .layer(middleware::from_fn_with_state(
//!         state.clone(),
//!         authenticate::<MyDirectory, MyStore>,
//!     ))
//!     .merge(auth_routes(state));
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod gate;
mod gateway;
mod routes;
mod state;
mod throttle;

pub use config::AuthConfig;
pub use error::AuthError;
pub use extractor::Principal;
pub use gate::{PermissionGate, PermissionGateService};
pub use gateway::authenticate;
pub use routes::{auth_routes, establish_session};
pub use state::AuthState;
pub use throttle::{Throttle, ThrottleService};
