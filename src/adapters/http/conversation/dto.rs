//! HTTP DTOs for the agent conversation API.

use serde::{Deserialize, Serialize};

use crate::application::{ConversationDetail, ConversationSummary};
use crate::domain::conversation::{
    Channel, Conversation, ConversationStatus, Direction, LeadProfile, Message, SenderType,
};
use crate::domain::foundation::{AgentId, DomainError};
use crate::ports::{ConversationFilter, DEFAULT_PAGE_SIZE};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Query parameters for listing conversations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListConversationsQuery {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl ListConversationsQuery {
    pub fn into_filter(self) -> Result<ConversationFilter, DomainError> {
        let assigned_agent_id = self.agent_id.map(AgentId::new).transpose()?;
        Ok(ConversationFilter {
            status: self.status,
            channel: self.channel,
            assigned_agent_id,
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            offset: self.offset.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Already-verified phone message handed over by the channel webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundPhoneRequest {
    pub phone_number: String,
    pub text: String,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub id: String,
    pub channel: Channel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_session_id: Option<String>,
    pub status: ConversationStatus,
    pub assigned_agent_id: Option<String>,
    pub lead: LeadProfile,
    pub last_message_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Conversation> for ConversationResponse {
    fn from(c: &Conversation) -> Self {
        Self {
            id: c.id().to_string(),
            channel: c.channel(),
            phone_number: c.identity().phone_number().map(str::to_string),
            web_session_id: c.identity().web_session_id().map(str::to_string),
            status: c.status(),
            assigned_agent_id: c.assigned_agent_id().map(|a| a.to_string()),
            lead: c.lead().clone(),
            last_message_at: c.last_message_at().as_datetime().to_rfc3339(),
            created_at: c.created_at().as_datetime().to_rfc3339(),
            updated_at: c.updated_at().as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationListResponse {
    pub items: Vec<ConversationResponse>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub direction: Direction,
    pub sender_type: SenderType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id.to_string(),
            direction: m.direction,
            sender_type: m.sender_type,
            content: m.content,
            metadata: m.metadata,
            created_at: m.created_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetailResponse {
    pub conversation: ConversationResponse,
    pub messages: Vec<MessageResponse>,
}

impl From<ConversationDetail> for ConversationDetailResponse {
    fn from(detail: ConversationDetail) -> Self {
        Self {
            conversation: ConversationResponse::from(&detail.conversation),
            messages: detail.messages.into_iter().map(MessageResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummaryResponse {
    pub conversation_id: String,
    pub status: ConversationStatus,
    pub lead: LeadProfile,
    pub message_count: u64,
    pub last_message_at: String,
}

impl From<ConversationSummary> for ConversationSummaryResponse {
    fn from(s: ConversationSummary) -> Self {
        Self {
            conversation_id: s.conversation_id.to_string(),
            status: s.status,
            lead: s.lead,
            message_count: s.message_count,
            last_message_at: s.last_message_at.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InboundPhoneResponse {
    pub conversation_id: String,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ProspectIdentity;

    #[test]
    fn list_query_defaults() {
        let filter = ListConversationsQuery::default().into_filter().unwrap();
        assert_eq!(filter.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset, 0);
        assert!(filter.status.is_none());
    }

    #[test]
    fn blank_agent_filter_is_rejected() {
        let query = ListConversationsQuery {
            agent_id: Some("  ".into()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());
    }

    #[test]
    fn phone_conversation_omits_session_field() {
        let c = Conversation::open(ProspectIdentity::phone("+2348000000001").unwrap());
        let json = serde_json::to_value(ConversationResponse::from(&c)).unwrap();
        assert_eq!(json["phone_number"], "+2348000000001");
        assert!(json.get("web_session_id").is_none());
        assert!(json["assigned_agent_id"].is_null());
    }
}
