//! Ports - interfaces for everything outside the domain.
//!
//! Adapters implement these; the application layer only ever sees the
//! traits.
//!
//! ## Storage
//!
//! - `ConversationRepository` - conversation records keyed by identity
//! - `MessageRepository` - append-only transcripts
//! - `ListingReader` - marketable listings for grounding
//!
//! ## External services
//!
//! - `AIProvider` - language-model completions
//! - `PhoneMessenger` - outbound phone-network messages
//! - `AgentTokenValidator` - dashboard token checks
//!
//! ## Events
//!
//! - `EventPublisher`, `EventSubscriber`, `EventHandler`

mod agent_token_validator;
mod ai_provider;
mod conversation_repository;
mod event_publisher;
mod event_subscriber;
mod listing_reader;
mod message_repository;
mod phone_messenger;

pub use agent_token_validator::AgentTokenValidator;
pub use ai_provider::{
    AIError, AIProvider, ChatMessage, ChatRole, CompletionRequest, CompletionResponse,
    FinishReason, ProviderInfo, TokenUsage,
};
pub use conversation_repository::{
    ConversationFilter, ConversationRepository, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use listing_reader::ListingReader;
pub use message_repository::MessageRepository;
pub use phone_messenger::{MessagingError, PhoneMessenger};
