//! HTTP adapter for the agent conversation API and channel entry points.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    ConversationDetailResponse, ConversationListResponse, ConversationResponse,
    ConversationSummaryResponse, InboundPhoneRequest, InboundPhoneResponse,
    ListConversationsQuery, MessageResponse, SendMessageRequest,
};
pub use handlers::ConversationApiState;
pub use routes::{conversation_routes, inbound_routes};
