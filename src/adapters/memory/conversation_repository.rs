//! In-memory conversation store.
//!
//! Used by tests and by local runs without a database. A single write lock
//! covers lookup and insert, which is what makes `find_or_create_open`
//! atomic per identity.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::{Conversation, ProspectIdentity};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp};
use crate::ports::{ConversationFilter, ConversationRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationRepository {
    conversations: Arc<RwLock<HashMap<ConversationId, Conversation>>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a conversation directly, bypassing creation rules.
    pub async fn insert(&self, conversation: Conversation) {
        self.conversations
            .write()
            .await
            .insert(conversation.id(), conversation);
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

fn not_found(id: ConversationId) -> DomainError {
    DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
        .with_detail("conversation_id", id.to_string())
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_or_create_open(
        &self,
        identity: &ProspectIdentity,
    ) -> Result<(Conversation, bool), DomainError> {
        let mut conversations = self.conversations.write().await;

        let existing = conversations
            .values()
            .find(|c| !c.is_closed() && c.identity() == identity);
        if let Some(conversation) = existing {
            return Ok((conversation.clone(), false));
        }

        let conversation = Conversation::open(identity.clone());
        conversations.insert(conversation.id(), conversation.clone());
        Ok((conversation, true))
    }

    async fn find_by_id(&self, id: ConversationId) -> Result<Option<Conversation>, DomainError> {
        Ok(self.conversations.read().await.get(&id).cloned())
    }

    async fn update_status(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut conversations = self.conversations.write().await;
        let stored = conversations
            .get_mut(&conversation.id())
            .ok_or_else(|| not_found(conversation.id()))?;
        // Checked under the write lock: a snapshot loaded before a close
        // must not reopen the row.
        stored.ensure_open()?;

        // Only status and agent come from the caller; lead and activity stay
        // as stored so concurrent writers don't clobber each other.
        *stored = Conversation::reconstitute(
            stored.id(),
            stored.identity().clone(),
            conversation.status(),
            stored.lead().clone(),
            conversation.assigned_agent_id().cloned(),
            stored.last_message_at(),
            stored.created_at(),
            Timestamp::now(),
        );
        Ok(())
    }

    async fn update_lead(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut conversations = self.conversations.write().await;
        let stored = conversations
            .get_mut(&conversation.id())
            .ok_or_else(|| not_found(conversation.id()))?;

        *stored = Conversation::reconstitute(
            stored.id(),
            stored.identity().clone(),
            stored.status(),
            conversation.lead().clone(),
            stored.assigned_agent_id().cloned(),
            stored.last_message_at(),
            stored.created_at(),
            Timestamp::now(),
        );
        Ok(())
    }

    async fn touch(&self, id: ConversationId, at: Timestamp) -> Result<(), DomainError> {
        let mut conversations = self.conversations.write().await;
        let stored = conversations.get_mut(&id).ok_or_else(|| not_found(id))?;
        stored.record_activity(at);
        Ok(())
    }

    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>, DomainError> {
        let conversations = self.conversations.read().await;
        let mut matching: Vec<Conversation> = conversations
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.last_message_at()
                .cmp(&a.last_message_at())
                .then_with(|| b.created_at().cmp(&a.created_at()))
        });

        Ok(matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }
}
