//! Message repository port.
//!
//! The transcript is append-only. Order is creation order, with insertion
//! order breaking ties between identical timestamps.

use async_trait::async_trait;

use crate::domain::conversation::Message;
use crate::domain::foundation::{ConversationId, DomainError};

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: &Message) -> Result<(), DomainError>;

    /// The latest `limit` messages, oldest first.
    async fn recent(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError>;

    /// The whole transcript, oldest first.
    async fn transcript(&self, conversation_id: ConversationId) -> Result<Vec<Message>, DomainError>;

    async fn count(&self, conversation_id: ConversationId) -> Result<u64, DomainError>;
}
