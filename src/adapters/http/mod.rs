//! HTTP adapters - REST API for agents and channel entry points.

pub mod conversation;
pub mod error;
pub mod middleware;

pub use conversation::{conversation_routes, inbound_routes, ConversationApiState};
pub use error::{ApiError, ErrorResponse};
