//! Conversation domain events.
//!
//! These are what the realtime layer fans out to dashboards and widgets.

use serde::{Deserialize, Serialize};

use super::{Channel, Conversation, ConversationStatus, Message, SenderType};
use crate::domain::foundation::{domain_event, AgentId, ConversationId, EventId, Timestamp};

pub const CONVERSATION_CREATED: &str = "conversation.created.v1";
pub const MESSAGE_RECORDED: &str = "conversation.message_recorded.v1";
pub const STATUS_CHANGED: &str = "conversation.status_changed.v1";

/// Every conversation event type, for subscribers that want them all.
pub const ALL_CONVERSATION_EVENTS: &[&str] =
    &[CONVERSATION_CREATED, MESSAGE_RECORDED, STATUS_CHANGED];

/// A conversation was opened for a new identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationCreated {
    pub event_id: EventId,
    pub conversation_id: ConversationId,
    pub channel: Channel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_session_id: Option<String>,
    pub status: ConversationStatus,
    pub created_at: Timestamp,
}

domain_event!(
    ConversationCreated,
    event_type = "conversation.created.v1",
    aggregate_id = conversation_id,
    aggregate_type = "Conversation",
    occurred_at = created_at,
    event_id = event_id
);

impl ConversationCreated {
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            event_id: EventId::new(),
            conversation_id: conversation.id(),
            channel: conversation.channel(),
            phone_number: conversation.identity().phone_number().map(str::to_string),
            web_session_id: conversation.identity().web_session_id().map(str::to_string),
            status: conversation.status(),
            created_at: conversation.created_at(),
        }
    }
}

/// A message was appended to the transcript. Dashboards call this
/// `new_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecorded {
    pub event_id: EventId,
    pub conversation_id: ConversationId,
    pub channel: Channel,
    pub sender: SenderType,
    pub message: Message,
    pub recorded_at: Timestamp,
}

domain_event!(
    MessageRecorded,
    event_type = "conversation.message_recorded.v1",
    aggregate_id = conversation_id,
    aggregate_type = "Conversation",
    occurred_at = recorded_at,
    event_id = event_id
);

impl MessageRecorded {
    pub fn new(channel: Channel, message: Message) -> Self {
        Self {
            event_id: EventId::new(),
            conversation_id: message.conversation_id,
            channel,
            sender: message.sender_type,
            recorded_at: message.created_at,
            message,
        }
    }
}

/// Reply ownership moved, or the conversation closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChanged {
    pub event_id: EventId,
    pub conversation_id: ConversationId,
    pub channel: Channel,
    pub previous_status: ConversationStatus,
    pub status: ConversationStatus,
    pub assigned_agent_id: Option<AgentId>,
    pub changed_at: Timestamp,
}

domain_event!(
    StatusChanged,
    event_type = "conversation.status_changed.v1",
    aggregate_id = conversation_id,
    aggregate_type = "Conversation",
    occurred_at = changed_at,
    event_id = event_id
);

impl StatusChanged {
    pub fn new(previous_status: ConversationStatus, conversation: &Conversation) -> Self {
        Self {
            event_id: EventId::new(),
            conversation_id: conversation.id(),
            channel: conversation.channel(),
            previous_status,
            status: conversation.status(),
            assigned_agent_id: conversation.assigned_agent_id().cloned(),
            changed_at: conversation.updated_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ProspectIdentity;
    use crate::domain::foundation::{DomainEvent, EventEnvelope};

    #[test]
    fn event_type_constants_match_macro_declarations() {
        let c = Conversation::open(ProspectIdentity::web("sess-1").unwrap());
        assert_eq!(
            ConversationCreated::from_conversation(&c).event_type(),
            CONVERSATION_CREATED
        );
        assert_eq!(
            MessageRecorded::new(c.channel(), Message::from_prospect(c.id(), "hi")).event_type(),
            MESSAGE_RECORDED
        );
        assert_eq!(
            StatusChanged::new(ConversationStatus::AiHandled, &c).event_type(),
            STATUS_CHANGED
        );
    }

    #[test]
    fn created_event_carries_identity_for_its_channel_only() {
        let c = Conversation::open(ProspectIdentity::phone("+2348000000001").unwrap());
        let event = ConversationCreated::from_conversation(&c);
        assert_eq!(event.phone_number.as_deref(), Some("+2348000000001"));
        assert!(event.web_session_id.is_none());
        assert_eq!(event.aggregate_id(), c.id().to_string());
    }

    #[test]
    fn message_recorded_envelope_exposes_sender() {
        let c = Conversation::open(ProspectIdentity::web("sess-1").unwrap());
        let event = MessageRecorded::new(c.channel(), Message::from_ai(c.id(), "Hello"));
        let env = EventEnvelope::from_event(&event).unwrap();
        assert_eq!(env.payload["sender"], "ai");
        assert_eq!(env.payload["channel"], "web");
        assert_eq!(env.payload["message"]["content"], "Hello");
    }

    #[test]
    fn status_changed_records_both_ends() {
        let mut c = Conversation::open(ProspectIdentity::web("sess-1").unwrap());
        c.take_over(AgentId::new("a-1").unwrap()).unwrap();
        let event = StatusChanged::new(ConversationStatus::AiHandled, &c);
        assert_eq!(event.previous_status, ConversationStatus::AiHandled);
        assert_eq!(event.status, ConversationStatus::AgentHandled);
        assert_eq!(event.assigned_agent_id.unwrap().as_str(), "a-1");
    }
}
