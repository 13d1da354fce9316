//! Scripted AI provider for tests and local runs without API keys.
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_response("We have a 2 bedroom in Lekki.")
//!     .with_error(MockError::Unavailable { message: "down".into() });
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, ProviderInfo,
    TokenUsage,
};

/// Reply used once the scripted queue runs dry.
pub const DEFAULT_MOCK_REPLY: &str = "Mock response";

/// Provider that replays queued responses in order and records each call.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    info: ProviderInfo,
    delay: Duration,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(String),
    Error(MockError),
}

/// Failures the mock can be told to produce.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    Timeout { timeout_secs: u32 },
    Parse { message: String },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::Timeout { timeout_secs },
            MockError::Parse { message } => AIError::parse(message),
        }
    }
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a successful completion.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.queue().push_back(MockResponse::Success(content.into()));
        self
    }

    /// Queues a failure.
    pub fn with_error(self, error: MockError) -> Self {
        self.queue().push_back(MockResponse::Error(error));
        self
    }

    /// Adds latency to every call, for deadline tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.recorded().len()
    }

    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        self.recorded().clone()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<MockResponse>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<CompletionRequest>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_response(&self) -> MockResponse {
        self.queue()
            .pop_front()
            .unwrap_or_else(|| MockResponse::Success(DEFAULT_MOCK_REPLY.to_string()))
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        self.recorded().push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_response() {
            MockResponse::Success(content) => Ok(CompletionResponse {
                usage: TokenUsage::new(10, content.split_whitespace().count() as u32),
                content,
                model: self.info.model.clone(),
                finish_reason: FinishReason::Stop,
            }),
            MockResponse::Error(err) => Err(err.into()),
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ChatRole;

    fn request() -> CompletionRequest {
        CompletionRequest::new().with_message(ChatRole::User, "hi")
    }

    #[tokio::test]
    async fn replays_queue_in_order_then_defaults() {
        let provider = MockAIProvider::new()
            .with_response("first")
            .with_error(MockError::AuthenticationFailed)
            .with_response("second");

        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert!(matches!(
            provider.complete(request()).await,
            Err(AIError::AuthenticationFailed)
        ));
        assert_eq!(provider.complete(request()).await.unwrap().content, "second");
        assert_eq!(
            provider.complete(request()).await.unwrap().content,
            DEFAULT_MOCK_REPLY
        );
    }

    #[tokio::test]
    async fn records_requests() {
        let provider = MockAIProvider::new();
        provider
            .complete(request().with_system_prompt("sys"))
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(
            provider.get_calls()[0].system_prompt.as_deref(),
            Some("sys")
        );
    }

    #[tokio::test]
    async fn clones_share_the_queue() {
        let provider = MockAIProvider::new().with_response("shared");
        let clone = provider.clone();
        assert_eq!(clone.complete(request()).await.unwrap().content, "shared");
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn reports_mock_info() {
        assert_eq!(MockAIProvider::new().provider_info().name, "mock");
    }
}
