//! HTTP handlers for the agent conversation API.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::adapters::http::error::{ApiError, ErrorResponse};
use crate::adapters::http::middleware::RequireAgent;
use crate::application::{ConversationOrchestrator, ConversationQueries};
use crate::domain::foundation::ConversationId;

use super::dto::{
    ConversationDetailResponse, ConversationListResponse, ConversationResponse,
    ConversationSummaryResponse, InboundPhoneRequest, InboundPhoneResponse,
    ListConversationsQuery, MessageResponse, SendMessageRequest,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ConversationApiState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub queries: Arc<ConversationQueries>,
}

impl ConversationApiState {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>, queries: Arc<ConversationQueries>) -> Self {
        Self {
            orchestrator,
            queries,
        }
    }
}

fn parse_id(raw: &str) -> Result<ConversationId, (StatusCode, Json<ErrorResponse>)> {
    raw.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid conversation ID")),
        )
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Queries
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<ConversationApiState>,
    RequireAgent(_agent): RequireAgent,
    Query(query): Query<ListConversationsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    let conversations = state.queries.active(&filter).await?;
    Ok(Json(ConversationListResponse {
        items: conversations.iter().map(ConversationResponse::from).collect(),
        limit: filter.effective_limit(),
        offset: filter.offset,
    }))
}

/// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<ConversationApiState>,
    RequireAgent(_agent): RequireAgent,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    match state.queries.detail(id).await {
        Ok(detail) => Json(ConversationDetailResponse::from(detail)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// GET /api/conversations/:id/summary
pub async fn get_summary(
    State(state): State<ConversationApiState>,
    RequireAgent(_agent): RequireAgent,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    match state.queries.summary(id).await {
        Ok(summary) => Json(ConversationSummaryResponse::from(summary)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Agent commands
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/conversations/:id/takeover
pub async fn takeover(
    State(state): State<ConversationApiState>,
    RequireAgent(agent): RequireAgent,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    match state.orchestrator.takeover(id, agent.id).await {
        Ok(c) => Json(ConversationResponse::from(&c)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// POST /api/conversations/:id/handback
pub async fn handback(
    State(state): State<ConversationApiState>,
    RequireAgent(_agent): RequireAgent,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    match state.orchestrator.handback(id).await {
        Ok(c) => Json(ConversationResponse::from(&c)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// POST /api/conversations/:id/messages
pub async fn send_message(
    State(state): State<ConversationApiState>,
    RequireAgent(agent): RequireAgent,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    match state
        .orchestrator
        .send_agent_message(id, &agent.id, &req.text)
        .await
    {
        Ok(message) => (StatusCode::CREATED, Json(MessageResponse::from(message))).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// POST /api/conversations/:id/close
pub async fn close(
    State(state): State<ConversationApiState>,
    RequireAgent(_agent): RequireAgent,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(rejection) => return rejection.into_response(),
    };
    match state.orchestrator.close(id).await {
        Ok(c) => Json(ConversationResponse::from(&c)).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Channel entry point
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/inbound/phone
///
/// Called by the phone channel's webhook handler once the envelope has
/// been verified.
pub async fn inbound_phone(
    State(state): State<ConversationApiState>,
    Json(req): Json<InboundPhoneRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .orchestrator
        .handle_prospect_message(&req.phone_number, &req.text)
        .await?;
    Ok(Json(InboundPhoneResponse {
        conversation_id: outcome.conversation_id.to_string(),
        created: outcome.created,
        reply: outcome.reply,
    }))
}
