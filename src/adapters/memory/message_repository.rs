//! In-memory transcript store. Insertion order is the tie-break.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::Message;
use crate::domain::foundation::{ConversationId, DomainError};
use crate::ports::MessageRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageRepository {
    transcripts: Arc<RwLock<HashMap<ConversationId, Vec<Message>>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored message across all conversations.
    pub async fn total(&self) -> usize {
        self.transcripts.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), DomainError> {
        let mut transcripts = self.transcripts.write().await;
        let transcript = transcripts.entry(message.conversation_id).or_default();

        // Keep creation order even if a caller appends out of order; the
        // stable sort leaves equal timestamps in insertion order.
        transcript.push(message.clone());
        transcript.sort_by_key(|m| m.created_at);
        Ok(())
    }

    async fn recent(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError> {
        let transcripts = self.transcripts.read().await;
        let transcript = transcripts
            .get(&conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = transcript.len().saturating_sub(limit);
        Ok(transcript[start..].to_vec())
    }

    async fn transcript(&self, conversation_id: ConversationId) -> Result<Vec<Message>, DomainError> {
        Ok(self
            .transcripts
            .read()
            .await
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn count(&self, conversation_id: ConversationId) -> Result<u64, DomainError> {
        Ok(self
            .transcripts
            .read()
            .await
            .get(&conversation_id)
            .map_or(0, |t| t.len() as u64))
    }
}
