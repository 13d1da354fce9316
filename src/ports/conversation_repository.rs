//! Conversation repository port.
//!
//! # Design
//!
//! - **Identity-keyed**: at most one non-closed conversation per phone
//!   number or web session id
//! - **Targeted writes**: status, activity and lead data are written
//!   separately, so a detached extraction pass never overwrites a takeover
//!   that landed while it was running

use async_trait::async_trait;

use crate::domain::conversation::{Channel, Conversation, ConversationStatus, ProspectIdentity};
use crate::domain::foundation::{AgentId, ConversationId, DomainError, Timestamp};

/// Largest page a listing query may request.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Default page size for listing queries.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Repository port for the Conversation aggregate.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Returns the open conversation for `identity`, creating one if none
    /// exists. The flag is `true` when the conversation was just created.
    ///
    /// Must be atomic per identity: two concurrent first messages from the
    /// same identity resolve to the same conversation.
    async fn find_or_create_open(
        &self,
        identity: &ProspectIdentity,
    ) -> Result<(Conversation, bool), DomainError>;

    async fn find_by_id(&self, id: ConversationId) -> Result<Option<Conversation>, DomainError>;

    /// Persists status and assigned agent. A stored CLOSED row is never
    /// overwritten, whatever snapshot the caller holds.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation doesn't exist
    /// - `ConversationClosed` if the stored conversation is closed
    async fn update_status(&self, conversation: &Conversation) -> Result<(), DomainError>;

    /// Persists the extracted lead fields only.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation doesn't exist
    async fn update_lead(&self, conversation: &Conversation) -> Result<(), DomainError>;

    /// Moves `last_message_at` forward to `at`. Never moves it backwards.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation doesn't exist
    async fn touch(&self, id: ConversationId, at: Timestamp) -> Result<(), DomainError>;

    /// Lists conversations matching `filter`, most recently active first.
    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>, DomainError>;
}

/// Dashboard listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationFilter {
    /// Exact status; `None` means every open status.
    pub status: Option<ConversationStatus>,
    pub channel: Option<Channel>,
    pub assigned_agent_id: Option<AgentId>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ConversationFilter {
    fn default() -> Self {
        Self {
            status: None,
            channel: None,
            assigned_agent_id: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ConversationFilter {
    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    /// True when `conversation` passes every criterion except paging.
    pub fn matches(&self, conversation: &Conversation) -> bool {
        let status_ok = match self.status {
            Some(status) => conversation.status() == status,
            None => !conversation.is_closed(),
        };
        let channel_ok = self.channel.map_or(true, |c| conversation.channel() == c);
        let agent_ok = self
            .assigned_agent_id
            .as_ref()
            .map_or(true, |a| conversation.assigned_agent_id() == Some(a));
        status_ok && channel_ok && agent_ok
    }
}
