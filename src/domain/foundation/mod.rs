//! Foundation module - shared domain primitives.
//!
//! Identifiers, timestamps, errors and the event plumbing used by the
//! conversation and listing modules.

mod auth;
mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedAgent};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{domain_event, DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{AgentId, ConversationId, ListingId, MessageId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
