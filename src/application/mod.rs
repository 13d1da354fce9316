//! Application layer: the orchestrator and the services it drives.
//!
//! - `orchestrator` - prospect messages and agent operations
//! - `grounding` - catalogue snapshot for reply prompts
//! - `response_generator` - replies that never fail
//! - `extraction` - detached lead extraction
//! - `outbound` - channel-aware delivery
//! - `queries` - dashboard reads

mod extraction;
mod grounding;
mod orchestrator;
mod outbound;
mod queries;
mod response_generator;

#[cfg(test)]
pub(crate) mod test_support;

pub use extraction::{ExtractionPassError, LeadExtractionEngine};
pub use grounding::GroundingProvider;
pub use orchestrator::{
    ConversationOrchestrator, InboundOutcome, WebChatReply, DEFAULT_HISTORY_LIMIT,
};
pub use outbound::OutboundChannelAdapter;
pub use queries::{ConversationDetail, ConversationQueries, ConversationSummary};
pub use response_generator::{to_chat_turns, GeneratorSettings, ResponseGenerator, FALLBACK_REPLY};
