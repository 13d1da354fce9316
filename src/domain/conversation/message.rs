//! Transcript messages.
//!
//! Messages are immutable once written. Transcript order is creation order.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    AgentId, ConversationId, MessageId, Timestamp, ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Prospect,
    Ai,
    Agent,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Prospect => "prospect",
            SenderType::Ai => "ai",
            SenderType::Agent => "agent",
        }
    }

    /// Prospects only ever write inbound; everyone else writes outbound.
    pub fn direction(&self) -> Direction {
        match self {
            SenderType::Prospect => Direction::Inbound,
            SenderType::Ai | SenderType::Agent => Direction::Outbound,
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Direction::Inbound),
            "outbound" => Ok(Direction::Outbound),
            other => Err(ValidationError::invalid_format(
                "direction",
                format!("unknown direction '{}'", other),
            )),
        }
    }
}

impl FromStr for SenderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prospect" => Ok(SenderType::Prospect),
            "ai" => Ok(SenderType::Ai),
            "agent" => Ok(SenderType::Agent),
            other => Err(ValidationError::invalid_format(
                "sender_type",
                format!("unknown sender type '{}'", other),
            )),
        }
    }
}

/// A single persisted message in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub direction: Direction,
    pub sender_type: SenderType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    pub created_at: Timestamp,
}

impl Message {
    fn compose(
        conversation_id: ConversationId,
        sender_type: SenderType,
        content: impl Into<String>,
        metadata: Option<JsonValue>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            direction: sender_type.direction(),
            sender_type,
            content: content.into(),
            metadata,
            created_at: Timestamp::now(),
        }
    }

    pub fn from_prospect(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self::compose(conversation_id, SenderType::Prospect, content, None)
    }

    pub fn from_ai(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self::compose(conversation_id, SenderType::Ai, content, None)
    }

    /// Outbound message written by a human agent. The agent id is kept in
    /// metadata so the transcript shows who answered.
    pub fn from_agent(
        conversation_id: ConversationId,
        agent_id: &AgentId,
        content: impl Into<String>,
    ) -> Self {
        let metadata = serde_json::json!({ "agent_id": agent_id.as_str() });
        Self::compose(conversation_id, SenderType::Agent, content, Some(metadata))
    }

    /// Attaches extra metadata, merging into any existing object.
    pub fn with_metadata(mut self, key: &str, value: JsonValue) -> Self {
        let mut map = match self.metadata.take() {
            Some(JsonValue::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        map.insert(key.to_string(), value);
        self.metadata = Some(JsonValue::Object(map));
        self
    }

    pub fn is_outbound(&self) -> bool {
        self.direction == Direction::Outbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prospect_messages_are_inbound() {
        let m = Message::from_prospect(ConversationId::new(), "hi");
        assert_eq!(m.direction, Direction::Inbound);
        assert_eq!(m.sender_type, SenderType::Prospect);
        assert!(!m.is_outbound());
    }

    #[test]
    fn ai_messages_are_outbound() {
        let m = Message::from_ai(ConversationId::new(), "hello");
        assert_eq!(m.direction, Direction::Outbound);
        assert_eq!(m.sender_type, SenderType::Ai);
    }

    #[test]
    fn agent_messages_record_agent_id() {
        let agent = AgentId::new("agent-1").unwrap();
        let m = Message::from_agent(ConversationId::new(), &agent, "I can help");
        assert_eq!(m.direction, Direction::Outbound);
        assert_eq!(m.metadata.unwrap()["agent_id"], "agent-1");
    }

    #[test]
    fn with_metadata_merges_keys() {
        let agent = AgentId::new("agent-1").unwrap();
        let m = Message::from_agent(ConversationId::new(), &agent, "x")
            .with_metadata("fallback", serde_json::json!(true));
        let meta = m.metadata.unwrap();
        assert_eq!(meta["agent_id"], "agent-1");
        assert_eq!(meta["fallback"], true);
    }

    #[test]
    fn sender_type_round_trips_through_str() {
        for s in [SenderType::Prospect, SenderType::Ai, SenderType::Agent] {
            assert_eq!(s.as_str().parse::<SenderType>().unwrap(), s);
        }
    }
}
