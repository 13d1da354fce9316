//! Dashboard token validation port.
//!
//! Dashboard connections and REST calls present a bearer token. Anything
//! that doesn't verify is turned away before it reaches a handler.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedAgent};

/// Validates dashboard tokens.
///
/// # Contract
///
/// - `InvalidToken` for malformed tokens or bad signatures
/// - `TokenExpired` when the signature is fine but `exp` has passed
/// - `ServiceUnavailable` for transient failures
#[async_trait]
pub trait AgentTokenValidator: Send + Sync {
    /// Validates `token` (without the `Bearer ` prefix).
    async fn validate(&self, token: &str) -> Result<AuthenticatedAgent, AuthError>;
}
