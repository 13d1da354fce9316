//! HTTP routes for the agent conversation API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{
    close, get_conversation, get_summary, handback, inbound_phone, list_conversations,
    send_message, takeover, ConversationApiState,
};

/// Agent-facing routes, nested under `/api/conversations`.
pub fn conversation_routes(state: ConversationApiState, auth: AuthState) -> Router {
    Router::new()
        .route("/", get(list_conversations))
        .route("/:id", get(get_conversation))
        .route("/:id/summary", get(get_summary))
        .route("/:id/takeover", post(takeover))
        .route("/:id/handback", post(handback))
        .route("/:id/messages", post(send_message))
        .route("/:id/close", post(close))
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state)
}

/// Channel entry points, nested under `/api/inbound`. Not agent-authenticated:
/// expose only to the verified webhook handler.
pub fn inbound_routes(state: ConversationApiState) -> Router {
    Router::new()
        .route("/phone", post(inbound_phone))
        .with_state(state)
}
