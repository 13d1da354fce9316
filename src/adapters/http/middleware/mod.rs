//! HTTP middleware for axum.
//!
//! - `auth` - agent bearer-token authentication and extractor

pub mod auth;

pub use auth::{auth_middleware, AuthState, RequireAgent};
