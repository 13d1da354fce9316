//! Mock token validator for tests and local dashboards.
//!
//! ```ignore
//! let validator = MockAgentValidator::new().with_agent("token-1", "agent-1");
//! let agent = validator.validate("token-1").await?;
//! ```

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::foundation::{AgentId, AuthError, AuthenticatedAgent};
use crate::ports::AgentTokenValidator;

/// Maps fixed tokens to agents. Unknown tokens are `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockAgentValidator {
    tokens: RwLock<HashMap<String, AuthenticatedAgent>>,
    force_error: RwLock<Option<AuthError>>,
}

impl MockAgentValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` for the agent `agent_id`.
    ///
    /// # Panics
    ///
    /// If `agent_id` is blank.
    pub fn with_agent(self, token: impl Into<String>, agent_id: &str) -> Self {
        let agent = AuthenticatedAgent::new(
            AgentId::new(agent_id).expect("agent id must not be blank"),
            Some(format!("Agent {}", agent_id)),
        );
        self.write_tokens().insert(token.into(), agent);
        self
    }

    /// Forces every validation to fail with `error`.
    pub fn with_error(self, error: AuthError) -> Self {
        *self.force_error.write().unwrap_or_else(|e| e.into_inner()) = Some(error);
        self
    }

    pub fn remove_token(&self, token: &str) {
        self.write_tokens().remove(token);
    }

    pub fn token_count(&self) -> usize {
        self.read_tokens().len()
    }

    fn read_tokens(&self) -> RwLockReadGuard<'_, HashMap<String, AuthenticatedAgent>> {
        self.tokens.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_tokens(&self) -> RwLockWriteGuard<'_, HashMap<String, AuthenticatedAgent>> {
        self.tokens.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AgentTokenValidator for MockAgentValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedAgent, AuthError> {
        if let Some(error) = self
            .force_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(error);
        }

        if token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        self.read_tokens()
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
