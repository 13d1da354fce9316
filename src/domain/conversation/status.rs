//! Conversation ownership status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Who currently owns replies on a conversation.
///
/// `AiHandled` and `AgentHandled` flip back and forth freely; `Closed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    AiHandled,
    AgentHandled,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::AiHandled => "ai_handled",
            ConversationStatus::AgentHandled => "agent_handled",
            ConversationStatus::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, ConversationStatus::Closed)
    }
}

impl StateMachine for ConversationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConversationStatus::*;
        // Self-loops on open states keep repeated takeover/handback idempotent.
        matches!(
            (self, target),
            (AiHandled, AiHandled)
                | (AiHandled, AgentHandled)
                | (AiHandled, Closed)
                | (AgentHandled, AgentHandled)
                | (AgentHandled, AiHandled)
                | (AgentHandled, Closed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConversationStatus::*;
        match self {
            AiHandled => vec![AiHandled, AgentHandled, Closed],
            AgentHandled => vec![AgentHandled, AiHandled, Closed],
            Closed => vec![],
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai_handled" => Ok(ConversationStatus::AiHandled),
            "agent_handled" => Ok(ConversationStatus::AgentHandled),
            "closed" => Ok(ConversationStatus::Closed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown conversation status '{}'", other),
            )),
        }
    }
}
