//! Authentication types for dashboard agents.
//!
//! Populated by an `AgentTokenValidator` adapter after a bearer token checks
//! out. The domain only cares that the caller is a known agent.

use super::AgentId;
use thiserror::Error;

/// Agent identity extracted from a validated dashboard token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAgent {
    pub id: AgentId,
    pub display_name: Option<String>,
}

impl AuthenticatedAgent {
    pub fn new(id: AgentId, display_name: Option<String>) -> Self {
        Self { id, display_name }
    }
}

/// Reasons a dashboard token is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// True when the client should obtain a fresh token before retrying.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredentials | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_require_reauthentication() {
        assert!(AuthError::InvalidToken.requires_reauthentication());
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(AuthError::MissingCredentials.requires_reauthentication());
        assert!(!AuthError::service_unavailable("down").requires_reauthentication());
    }

    #[test]
    fn service_unavailable_displays_message() {
        let err = AuthError::service_unavailable("Connection refused");
        assert_eq!(err.to_string(), "Auth service unavailable: Connection refused");
    }
}
