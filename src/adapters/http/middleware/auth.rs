//! Agent authentication for the dashboard API.
//!
//! ```text
//! Request → auth_middleware → injects AuthenticatedAgent into extensions
//!                                      ↓
//!                              Handler → RequireAgent reads from extensions
//! ```
//!
//! The middleware only sees the `AgentTokenValidator` port, so the JWT
//! validator and the test mock plug in the same way.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedAgent};
use crate::ports::AgentTokenValidator;

use super::super::error::ErrorResponse;

pub type AuthState = Arc<dyn AgentTokenValidator>;

/// Validates `Authorization: Bearer <token>` and injects the agent.
///
/// A request without a token passes through untouched; `RequireAgent`
/// turns it away. A token that is present but bad is a 401 here.
pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    let Some(token) = token else {
        return next.run(request).await;
    };

    match validator.validate(&token).await {
        Ok(agent) => {
            request.extensions_mut().insert(agent);
            next.run(request).await
        }
        Err(e) => auth_error_response(&e),
    }
}

fn auth_error_response(error: &AuthError) -> Response {
    let (status, message) = match error {
        AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
        AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "Authentication required"),
        AuthError::ServiceUnavailable(msg) => {
            tracing::error!(error = %msg, "agent token validation unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service unavailable",
            )
        }
    };
    (status, Json(ErrorResponse::new("UNAUTHORIZED", message))).into_response()
}

/// Extractor for handlers that need a signed-in agent.
#[derive(Debug, Clone)]
pub struct RequireAgent(pub AuthenticatedAgent);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAgent
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedAgent>()
            .cloned()
            .map(RequireAgent)
            .ok_or_else(|| auth_error_response(&AuthError::MissingCredentials))
    }
}
