//! Read side for the agent dashboard.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::conversation::{Conversation, ConversationStatus, LeadProfile, Message};
use crate::domain::foundation::{ConversationId, DomainError, Timestamp};
use crate::ports::{ConversationFilter, ConversationRepository, MessageRepository};

use super::orchestrator::not_found;

/// A conversation with its full transcript, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub status: ConversationStatus,
    pub lead: LeadProfile,
    pub message_count: u64,
    pub last_message_at: Timestamp,
}

pub struct ConversationQueries {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
}

impl ConversationQueries {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
    ) -> Self {
        Self {
            conversations,
            messages,
        }
    }

    /// Conversations matching `filter`, most recently active first.
    pub async fn active(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>, DomainError> {
        self.conversations.list(filter).await
    }

    pub async fn find(&self, id: ConversationId) -> Result<Conversation, DomainError> {
        self.conversations
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn detail(&self, id: ConversationId) -> Result<ConversationDetail, DomainError> {
        let conversation = self.find(id).await?;
        let messages = self.messages.transcript(id).await?;
        Ok(ConversationDetail {
            conversation,
            messages,
        })
    }

    pub async fn summary(&self, id: ConversationId) -> Result<ConversationSummary, DomainError> {
        let conversation = self.find(id).await?;
        let message_count = self.messages.count(id).await?;
        Ok(ConversationSummary {
            conversation_id: id,
            status: conversation.status(),
            lead: conversation.lead().clone(),
            message_count,
            last_message_at: conversation.last_message_at(),
        })
    }
}
