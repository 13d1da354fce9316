//! WebSocket wire protocol.
//!
//! - Server → Client: connection status, conversation events, widget
//!   replies, acks, errors, pongs
//! - Client → Server: ping, room joins/leaves, widget chat messages

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp};

// ============================================
// Server → Client Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection accepted.
    Connected(ConnectedMessage),

    /// A conversation was opened.
    ConversationCreated(ConversationEventMessage),

    /// A message was appended to a transcript.
    NewMessage(ConversationEventMessage),

    /// Reply ownership changed or the conversation closed.
    StatusChanged(ConversationEventMessage),

    /// Widget-shaped outbound message for web-chat clients.
    Reply(ReplyMessage),

    /// Synchronous answer to a widget `message` command.
    MessageAck(MessageAckMessage),

    Error(ErrorMessage),

    Pong(PongMessage),
}

/// Which kind of client a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    Widget,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectedMessage {
    pub client_id: String,
    pub role: ClientRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub timestamp: String,
}

/// Dashboard event: the affected conversation plus the full event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationEventMessage {
    pub conversation_id: String,
    pub data: serde_json::Value,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyMessage {
    pub conversation_id: String,
    pub message_id: String,
    /// `ai` or `agent`.
    pub sender: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageAckMessage {
    pub conversation_id: String,
    /// `None` while an agent owns the conversation.
    pub response: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: code.into(),
            message: message.into(),
            timestamp: now_rfc3339(),
        })
    }

    pub fn from_domain_error(err: &DomainError) -> Self {
        Self::error(err.code.to_string(), err.message.clone())
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: now_rfc3339(),
        })
    }
}

pub(crate) fn now_rfc3339() -> String {
    Timestamp::now().as_datetime().to_rfc3339()
}

// ============================================
// Client → Server Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,

    /// Subscribe to one conversation's room.
    JoinConversation { conversation_id: String },

    LeaveConversation { conversation_id: String },

    /// Widget chat text. Rejected on dashboard connections.
    Message { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn server_messages_are_tagged_snake_case() {
        let msg = ServerMessage::NewMessage(ConversationEventMessage {
            conversation_id: "c-1".into(),
            data: serde_json::json!({"sender": "ai"}),
            timestamp: "2024-01-01T00:00:00Z".into(),
            correlation_id: None,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "new_message");
        assert_eq!(json["conversation_id"], "c-1");
        assert!(json.get("correlation_id").is_none());
    }

    #[test]
    fn reply_and_ack_tags() {
        let reply = ServerMessage::Reply(ReplyMessage {
            conversation_id: "c".into(),
            message_id: "m".into(),
            sender: "agent".into(),
            content: "Hi".into(),
            timestamp: "t".into(),
        });
        assert_eq!(serde_json::to_value(&reply).unwrap()["type"], "reply");

        let ack = ServerMessage::MessageAck(MessageAckMessage {
            conversation_id: "c".into(),
            response: Some("Hello".into()),
            timestamp: "t".into(),
        });
        assert_eq!(serde_json::to_value(&ack).unwrap()["type"], "message_ack");
    }

    #[test]
    fn domain_errors_carry_their_code() {
        let err = DomainError::new(ErrorCode::ConversationNotFound, "gone");
        let json = serde_json::to_value(ServerMessage::from_domain_error(&err)).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "CONVERSATION_NOT_FOUND");
        assert_eq!(json["message"], "gone");
    }

    #[test]
    fn client_commands_parse() {
        let join: ClientMessage =
            serde_json::from_str(r#"{"type": "join_conversation", "conversation_id": "abc"}"#)
                .unwrap();
        assert_eq!(
            join,
            ClientMessage::JoinConversation {
                conversation_id: "abc".into()
            }
        );

        let text: ClientMessage =
            serde_json::from_str(r#"{"type": "message", "text": "hello"}"#).unwrap();
        assert_eq!(text, ClientMessage::Message { text: "hello".into() });

        let ping: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping);
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "shout"}"#).is_err());
    }
}
