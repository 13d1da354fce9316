//! Conversation aggregate.
//!
//! One record per prospect thread, keyed by phone number or web session id.
//!
//! # Invariants
//!
//! - exactly one of phone number / web session id is set, matching `channel`
//! - `assigned_agent_id` is `Some` only while the status is `AgentHandled`
//! - a closed conversation accepts no further state changes
//! - lead data only ever grows: extraction merges, it never clears

use serde::Serialize;

use super::{Channel, ConversationStatus, LeadProfile, LeadUpdate, ProspectIdentity};
use crate::domain::foundation::{
    AgentId, ConversationId, DomainError, ErrorCode, StateMachine, Timestamp,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    id: ConversationId,

    #[serde(flatten)]
    identity: ProspectIdentity,

    status: ConversationStatus,

    #[serde(flatten)]
    lead: LeadProfile,

    assigned_agent_id: Option<AgentId>,

    last_message_at: Timestamp,

    created_at: Timestamp,

    updated_at: Timestamp,
}

impl Conversation {
    /// Opens a fresh AI-handled conversation for `identity`.
    pub fn open(identity: ProspectIdentity) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            identity,
            status: ConversationStatus::AiHandled,
            lead: LeadProfile::default(),
            assigned_agent_id: None,
            last_message_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a conversation from storage. No validation, no events.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ConversationId,
        identity: ProspectIdentity,
        status: ConversationStatus,
        lead: LeadProfile,
        assigned_agent_id: Option<AgentId>,
        last_message_at: Timestamp,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        // Stored rows predating the agent invariant still load cleanly.
        let assigned_agent_id = match status {
            ConversationStatus::AgentHandled => assigned_agent_id,
            _ => None,
        };
        Self {
            id,
            identity,
            status,
            lead,
            assigned_agent_id,
            last_message_at,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn identity(&self) -> &ProspectIdentity {
        &self.identity
    }

    pub fn channel(&self) -> Channel {
        self.identity.channel()
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn lead(&self) -> &LeadProfile {
        &self.lead
    }

    pub fn assigned_agent_id(&self) -> Option<&AgentId> {
        self.assigned_agent_id.as_ref()
    }

    pub fn last_message_at(&self) -> Timestamp {
        self.last_message_at
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_closed(&self) -> bool {
        self.status == ConversationStatus::Closed
    }

    /// True when inbound messages should be answered automatically.
    pub fn is_ai_handled(&self) -> bool {
        self.status == ConversationStatus::AiHandled
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Hands the conversation to a human agent.
    ///
    /// Repeating the call with the same or another agent succeeds and the
    /// latest agent wins.
    ///
    /// # Errors
    ///
    /// - `ConversationClosed` if the conversation is closed
    pub fn take_over(&mut self, agent_id: AgentId) -> Result<(), DomainError> {
        self.transition(ConversationStatus::AgentHandled)?;
        self.assigned_agent_id = Some(agent_id);
        Ok(())
    }

    /// Returns reply ownership to the assistant and clears the agent.
    ///
    /// # Errors
    ///
    /// - `ConversationClosed` if the conversation is closed
    pub fn hand_back(&mut self) -> Result<(), DomainError> {
        self.transition(ConversationStatus::AiHandled)?;
        self.assigned_agent_id = None;
        Ok(())
    }

    /// Closes the conversation for good. The record is kept for audit.
    ///
    /// # Errors
    ///
    /// - `ConversationClosed` if it is already closed
    pub fn close(&mut self) -> Result<(), DomainError> {
        self.transition(ConversationStatus::Closed)?;
        self.assigned_agent_id = None;
        Ok(())
    }

    /// Bumps `last_message_at`. It never moves backwards.
    pub fn record_activity(&mut self, at: Timestamp) {
        self.last_message_at = self.last_message_at.max(at);
        self.updated_at = Timestamp::now();
    }

    /// Merges an extraction pass. Returns whether anything changed.
    pub fn apply_lead_update(&mut self, update: LeadUpdate) -> bool {
        let changed = self.lead.merge(update);
        if changed {
            self.updated_at = Timestamp::now();
        }
        changed
    }

    /// Fails with `ConversationClosed` when the conversation is closed.
    pub fn ensure_open(&self) -> Result<(), DomainError> {
        if self.is_closed() {
            return Err(DomainError::new(
                ErrorCode::ConversationClosed,
                "Conversation is closed",
            )
            .with_detail("conversation_id", self.id.to_string()));
        }
        Ok(())
    }

    fn transition(&mut self, target: ConversationStatus) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.status = self.status.transition_to(target)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
