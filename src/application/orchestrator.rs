//! Conversation orchestrator.
//!
//! Every prospect message and every agent action goes through here. The
//! orchestrator resolves the conversation, persists the transcript, decides
//! whether the assistant or a human owns the reply, and publishes the
//! domain events the realtime layer fans out.
//!
//! ```text
//! inbound ─► resolve/create ─► persist ─► agent-handled? ──yes──► event, done
//!                                              │ no
//!                                              ▼
//!                             ground ─► generate ─► persist ─► deliver
//!                                                      │
//!                                     spawn extraction ◄┘ ─► event
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::conversation::{
    Conversation, ConversationCreated, Message, MessageRecorded, ProspectIdentity, StatusChanged,
};
use crate::domain::foundation::{
    AgentId, ConversationId, DomainError, DomainEvent, ErrorCode, EventEnvelope,
};
use crate::ports::{ConversationRepository, EventPublisher, MessageRepository, MessagingError};

use super::extraction::LeadExtractionEngine;
use super::grounding::GroundingProvider;
use super::outbound::OutboundChannelAdapter;
use super::response_generator::ResponseGenerator;

/// Transcript turns handed to the model with each reply.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Result of one inbound exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundOutcome {
    pub conversation_id: ConversationId,
    /// True when this message opened the conversation.
    pub created: bool,
    /// The assistant's reply; `None` while an agent owns the conversation.
    pub reply: Option<String>,
}

/// What the web widget gets back synchronously.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebChatReply {
    pub response: Option<String>,
    pub conversation_id: ConversationId,
}

pub struct ConversationOrchestrator {
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    grounding: GroundingProvider,
    generator: ResponseGenerator,
    extraction: Arc<LeadExtractionEngine>,
    outbound: OutboundChannelAdapter,
    events: Arc<dyn EventPublisher>,
    history_limit: usize,
}

impl ConversationOrchestrator {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        grounding: GroundingProvider,
        generator: ResponseGenerator,
        extraction: Arc<LeadExtractionEngine>,
        outbound: OutboundChannelAdapter,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            conversations,
            messages,
            grounding,
            generator,
            extraction,
            outbound,
            events,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Prospect entry points
    // ─────────────────────────────────────────────────────────────────────

    /// Entry point for the phone channel, after envelope verification.
    pub async fn handle_prospect_message(
        &self,
        phone_number: &str,
        text: &str,
    ) -> Result<InboundOutcome, DomainError> {
        let identity = ProspectIdentity::phone(phone_number)?;
        self.handle_inbound_message(&identity, text).await
    }

    /// Entry point for the web widget. The reply is returned here and also
    /// broadcast to the conversation room.
    pub async fn handle_web_chat_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<WebChatReply, DomainError> {
        let identity = ProspectIdentity::web(session_id)?;
        let outcome = self.handle_inbound_message(&identity, text).await?;
        Ok(WebChatReply {
            response: outcome.reply,
            conversation_id: outcome.conversation_id,
        })
    }

    /// Handles one prospect message end to end.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for blank text
    /// - `DeliveryFailed` if the phone send failed; the reply is still
    ///   persisted and broadcast
    /// - store errors as-is
    pub async fn handle_inbound_message(
        &self,
        identity: &ProspectIdentity,
        text: &str,
    ) -> Result<InboundOutcome, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("text", "Message text cannot be empty"));
        }

        let (conversation, created) = self.conversations.find_or_create_open(identity).await?;
        let conversation_id = conversation.id();
        if created {
            info!(%conversation_id, channel = %conversation.channel(), "conversation opened");
            self.publish(&ConversationCreated::from_conversation(&conversation))
                .await;
        }

        let inbound = Message::from_prospect(conversation_id, text);
        self.messages.append(&inbound).await?;
        self.conversations
            .touch(conversation_id, inbound.created_at)
            .await?;
        let inbound_id = inbound.id;
        self.publish(&MessageRecorded::new(conversation.channel(), inbound))
            .await;

        if !conversation.is_ai_handled() {
            debug!(%conversation_id, "agent owns the conversation, no auto-reply");
            return Ok(InboundOutcome {
                conversation_id,
                created,
                reply: None,
            });
        }

        let system_prompt = self.grounding.system_prompt().await;
        let history: Vec<Message> = self
            .messages
            .recent(conversation_id, self.history_limit + 1)
            .await?
            .into_iter()
            .filter(|m| m.id != inbound_id)
            .collect();
        let skip = history.len().saturating_sub(self.history_limit);
        let reply_text = self
            .generator
            .generate(&system_prompt, &history[skip..], text, Some(conversation_id))
            .await;

        let reply = Message::from_ai(conversation_id, reply_text.clone());
        self.messages.append(&reply).await?;
        self.conversations
            .touch(conversation_id, reply.created_at)
            .await?;

        let delivery = self.outbound.send(conversation.identity(), &reply_text).await;

        self.extraction.spawn(conversation_id);
        self.publish(&MessageRecorded::new(conversation.channel(), reply))
            .await;

        delivery.map_err(|e| delivery_failed(conversation_id, e))?;

        Ok(InboundOutcome {
            conversation_id,
            created,
            reply: Some(reply_text),
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Agent operations
    // ─────────────────────────────────────────────────────────────────────

    /// Hands the conversation to `agent_id`. Repeating it re-emits
    /// `status_changed` and the latest agent wins.
    pub async fn takeover(
        &self,
        conversation_id: ConversationId,
        agent_id: AgentId,
    ) -> Result<Conversation, DomainError> {
        let mut conversation = self.load(conversation_id).await?;
        let previous = conversation.status();
        conversation.take_over(agent_id.clone())?;
        self.conversations.update_status(&conversation).await?;

        info!(%conversation_id, %agent_id, "agent took over");
        self.publish(&StatusChanged::new(previous, &conversation)).await;
        Ok(conversation)
    }

    pub async fn handback(&self, conversation_id: ConversationId) -> Result<Conversation, DomainError> {
        let mut conversation = self.load(conversation_id).await?;
        let previous = conversation.status();
        conversation.hand_back()?;
        self.conversations.update_status(&conversation).await?;

        info!(%conversation_id, "handed back to assistant");
        self.publish(&StatusChanged::new(previous, &conversation)).await;
        Ok(conversation)
    }

    /// Sends a human-authored message. Leaves the status alone: an agent
    /// can chip in without taking over.
    pub async fn send_agent_message(
        &self,
        conversation_id: ConversationId,
        agent_id: &AgentId,
        text: &str,
    ) -> Result<Message, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("text", "Message text cannot be empty"));
        }

        let conversation = self.load(conversation_id).await?;
        conversation.ensure_open()?;

        let message = Message::from_agent(conversation_id, agent_id, text);
        self.messages.append(&message).await?;
        self.conversations
            .touch(conversation_id, message.created_at)
            .await?;

        let delivery = self.outbound.send(conversation.identity(), text).await;
        self.publish(&MessageRecorded::new(conversation.channel(), message.clone()))
            .await;
        delivery.map_err(|e| delivery_failed(conversation_id, e))?;

        debug!(%conversation_id, %agent_id, "agent message sent");
        Ok(message)
    }

    pub async fn close(&self, conversation_id: ConversationId) -> Result<Conversation, DomainError> {
        let mut conversation = self.load(conversation_id).await?;
        let previous = conversation.status();
        conversation.close()?;
        self.conversations.update_status(&conversation).await?;

        info!(%conversation_id, "conversation closed");
        self.publish(&StatusChanged::new(previous, &conversation)).await;
        Ok(conversation)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    async fn load(&self, conversation_id: ConversationId) -> Result<Conversation, DomainError> {
        self.conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| not_found(conversation_id))
    }

    /// Events are best-effort: a failed publish is logged and the
    /// operation still succeeds.
    async fn publish<E: DomainEvent + Serialize>(&self, event: &E) {
        let envelope = match EventEnvelope::from_event(event) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(event_type = event.event_type(), error = %e, "event serialization failed");
                return;
            }
        };
        if let Err(e) = self.events.publish(envelope).await {
            warn!(event_type = event.event_type(), error = %e, "event publish failed");
        }
    }
}

pub(crate) fn not_found(conversation_id: ConversationId) -> DomainError {
    DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
        .with_detail("conversation_id", conversation_id.to_string())
}

fn delivery_failed(conversation_id: ConversationId, error: MessagingError) -> DomainError {
    warn!(%conversation_id, error = %error, "reply delivery failed");
    DomainError::new(ErrorCode::DeliveryFailed, format!("Reply not delivered: {}", error))
        .with_detail("conversation_id", conversation_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{
        InMemoryConversationRepository, InMemoryMessageRepository, StaticListingReader,
    };
    use crate::adapters::messaging::RecordingMessenger;
    use crate::application::response_generator::FALLBACK_REPLY;
    use crate::domain::conversation::events::{MESSAGE_RECORDED, STATUS_CHANGED};
    use crate::domain::conversation::{ConversationStatus, PromptSettings, SenderType};

    struct Harness {
        conversations: InMemoryConversationRepository,
        messages: InMemoryMessageRepository,
        messenger: RecordingMessenger,
        provider: MockAIProvider,
        bus: Arc<InMemoryEventBus>,
        orchestrator: ConversationOrchestrator,
    }

    fn harness(provider: MockAIProvider) -> Harness {
        let conversations = InMemoryConversationRepository::new();
        let messages = InMemoryMessageRepository::new();
        let listings = StaticListingReader::default();
        let messenger = RecordingMessenger::new();
        let bus = Arc::new(InMemoryEventBus::recording());
        let ai: Arc<dyn crate::ports::AIProvider> = Arc::new(provider.clone());

        let orchestrator = ConversationOrchestrator::new(
            Arc::new(conversations.clone()),
            Arc::new(messages.clone()),
            GroundingProvider::new(Arc::new(listings.clone()), PromptSettings::default()),
            ResponseGenerator::new(Some(ai.clone())),
            Arc::new(LeadExtractionEngine::new(
                Arc::new(conversations.clone()),
                Arc::new(messages.clone()),
                Arc::new(listings),
                None,
            )),
            OutboundChannelAdapter::new(Arc::new(messenger.clone())),
            bus.clone(),
        );

        Harness {
            conversations,
            messages,
            messenger,
            provider,
            bus,
            orchestrator,
        }
    }

    fn agent(id: &str) -> AgentId {
        AgentId::new(id).unwrap()
    }

    #[tokio::test]
    async fn first_message_opens_conversation_and_replies() {
        let h = harness(MockAIProvider::new().with_response("Welcome!"));

        let outcome = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "Hello")
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.reply.as_deref(), Some("Welcome!"));
        let transcript = h.messages.transcript(outcome.conversation_id).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].sender_type, SenderType::Prospect);
        assert_eq!(transcript[1].sender_type, SenderType::Ai);
        assert_eq!(h.messenger.sent_to("+2348000000001"), vec!["Welcome!"]);
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_anything_is_written() {
        let h = harness(MockAIProvider::new());
        let err = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "   ")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(h.conversations.is_empty().await);
    }

    #[tokio::test]
    async fn history_excludes_the_new_message_and_is_bounded() {
        let h = harness(MockAIProvider::new());
        let orchestrator = h.orchestrator.with_history_limit(3);
        for text in ["one", "two", "three"] {
            orchestrator
                .handle_prospect_message("+2348000000001", text)
                .await
                .unwrap();
        }

        let calls = h.provider.get_calls();
        let last = calls.last().unwrap();
        // 3 history turns plus the new message.
        assert_eq!(last.messages.len(), 4);
        assert_eq!(last.messages[3].content, "three");
        assert!(last.messages[..3].iter().all(|m| m.content != "three"));
    }

    #[tokio::test]
    async fn agent_handled_conversation_gets_no_ai_reply() {
        let h = harness(MockAIProvider::new());
        let first = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "Hello")
            .await
            .unwrap();
        h.orchestrator
            .takeover(first.conversation_id, agent("agent-7"))
            .await
            .unwrap();
        let calls_before = h.provider.call_count();

        let outcome = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "Are you there?")
            .await
            .unwrap();

        assert_eq!(outcome.reply, None);
        assert_eq!(h.provider.call_count(), calls_before);
        let transcript = h.messages.transcript(first.conversation_id).await.unwrap();
        assert_eq!(transcript.last().unwrap().content, "Are you there?");
        assert_eq!(
            transcript
                .iter()
                .filter(|m| m.sender_type == SenderType::Ai)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn generator_failure_still_persists_and_broadcasts_fallback() {
        let h = harness(MockAIProvider::new().with_error(MockError::Timeout { timeout_secs: 30 }));
        let outcome = h
            .orchestrator
            .handle_web_chat_message("sess-123", "Hi")
            .await
            .unwrap();

        assert_eq!(outcome.response.as_deref(), Some(FALLBACK_REPLY));
        let transcript = h.messages.transcript(outcome.conversation_id).await.unwrap();
        assert_eq!(transcript[1].content, FALLBACK_REPLY);

        let recorded: Vec<MessageRecorded> = h
            .bus
            .events_of_type(MESSAGE_RECORDED)
            .iter()
            .map(|e| e.payload_as().unwrap())
            .collect();
        assert_eq!(recorded.last().unwrap().sender, SenderType::Ai);
    }

    #[tokio::test]
    async fn delivery_failure_surfaces_after_persisting() {
        let h = harness(MockAIProvider::new().with_response("Hi there"));
        h.messenger
            .fail_with(Some(MessagingError::network("connection reset")));

        let err = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "Hello")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeliveryFailed);

        let conversations = h.conversations.list(&Default::default()).await.unwrap();
        let transcript = h.messages.transcript(conversations[0].id()).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(h.bus.events_of_type(MESSAGE_RECORDED).len(), 2);
    }

    #[tokio::test]
    async fn takeover_then_handback_emits_two_status_events() {
        let h = harness(MockAIProvider::new());
        let id = h
            .orchestrator
            .handle_web_chat_message("sess-123", "Hi")
            .await
            .unwrap()
            .conversation_id;

        let taken = h.orchestrator.takeover(id, agent("agent-1")).await.unwrap();
        assert_eq!(taken.status(), ConversationStatus::AgentHandled);
        let back = h.orchestrator.handback(id).await.unwrap();
        assert_eq!(back.status(), ConversationStatus::AiHandled);
        assert_eq!(back.assigned_agent_id(), None);

        let changes: Vec<StatusChanged> = h
            .bus
            .events_of_type(STATUS_CHANGED)
            .iter()
            .map(|e| e.payload_as().unwrap())
            .collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].status, ConversationStatus::AgentHandled);
        assert_eq!(changes[1].status, ConversationStatus::AiHandled);
    }

    #[tokio::test]
    async fn repeated_takeover_emits_each_time_and_latest_agent_wins() {
        let h = harness(MockAIProvider::new());
        let id = h
            .orchestrator
            .handle_web_chat_message("sess-123", "Hi")
            .await
            .unwrap()
            .conversation_id;

        h.orchestrator.takeover(id, agent("a")).await.unwrap();
        h.orchestrator.takeover(id, agent("b")).await.unwrap();

        let stored = h.conversations.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.assigned_agent_id(), Some(&agent("b")));
        assert_eq!(h.bus.events_of_type(STATUS_CHANGED).len(), 2);
    }

    #[tokio::test]
    async fn agent_message_without_takeover_keeps_status() {
        let h = harness(MockAIProvider::new());
        let id = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "Hi")
            .await
            .unwrap()
            .conversation_id;

        let msg = h
            .orchestrator
            .send_agent_message(id, &agent("agent-2"), "Hello from the team")
            .await
            .unwrap();

        assert_eq!(msg.sender_type, SenderType::Agent);
        let stored = h.conversations.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), ConversationStatus::AiHandled);
        assert!(h
            .messenger
            .sent_to("+2348000000001")
            .contains(&"Hello from the team".to_string()));
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found_without_writes() {
        let h = harness(MockAIProvider::new());
        let missing = ConversationId::new();

        for err in [
            h.orchestrator.takeover(missing, agent("a")).await.unwrap_err(),
            h.orchestrator.handback(missing).await.unwrap_err(),
            h.orchestrator.close(missing).await.unwrap_err(),
            h.orchestrator
                .send_agent_message(missing, &agent("a"), "hi")
                .await
                .unwrap_err(),
        ] {
            assert!(err.is_not_found());
        }
        assert_eq!(h.messages.total().await, 0);
        assert_eq!(h.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn closed_conversation_rejects_agent_actions_and_new_message_reopens() {
        let h = harness(MockAIProvider::new());
        let id = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "Hi")
            .await
            .unwrap()
            .conversation_id;
        h.orchestrator.close(id).await.unwrap();

        let err = h.orchestrator.takeover(id, agent("a")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConversationClosed);
        let err = h
            .orchestrator
            .send_agent_message(id, &agent("a"), "hello?")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConversationClosed);

        let next = h
            .orchestrator
            .handle_prospect_message("+2348000000001", "Back again")
            .await
            .unwrap();
        assert!(next.created);
        assert_ne!(next.conversation_id, id);
    }
}
