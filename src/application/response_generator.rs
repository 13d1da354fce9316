//! Response generator.
//!
//! Wraps the completion port so reply generation can never fail: a missing
//! provider, a provider error, an empty completion or an expired deadline
//! all yield [`FALLBACK_REPLY`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::conversation::{Message, SenderType};
use crate::domain::foundation::ConversationId;
use crate::ports::{AIError, AIProvider, ChatMessage, ChatRole, CompletionRequest};

/// Sent whenever a real reply can't be produced.
pub const FALLBACK_REPLY: &str = "Sorry, I'm having trouble responding right now. \
    A member of our team will get back to you shortly.";

/// Tuning for reply completions.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Hard bound on one generation, on top of the provider's own timeout.
    pub deadline: Option<Duration>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            temperature: 0.7,
            deadline: None,
        }
    }
}

pub struct ResponseGenerator {
    provider: Option<Arc<dyn AIProvider>>,
    settings: GeneratorSettings,
    unavailable_logged: AtomicBool,
}

impl ResponseGenerator {
    /// `None` means no credentials were configured; every call falls back.
    pub fn new(provider: Option<Arc<dyn AIProvider>>) -> Self {
        Self {
            provider,
            settings: GeneratorSettings::default(),
            unavailable_logged: AtomicBool::new(false),
        }
    }

    pub fn with_settings(mut self, settings: GeneratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.settings.deadline = Some(deadline);
        self
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Produces a reply to `new_message`. `history` is oldest first and
    /// must not include `new_message` itself.
    pub async fn generate(
        &self,
        system_prompt: &str,
        history: &[Message],
        new_message: &str,
        conversation_id: Option<ConversationId>,
    ) -> String {
        let Some(provider) = self.provider.as_ref() else {
            if !self.unavailable_logged.swap(true, Ordering::Relaxed) {
                tracing::warn!("no language model configured; replies use the fallback text");
            }
            return FALLBACK_REPLY.to_string();
        };

        let mut request = CompletionRequest::new()
            .with_system_prompt(system_prompt)
            .with_messages(to_chat_turns(history))
            .with_message(ChatRole::User, new_message)
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature);
        if let Some(id) = conversation_id {
            request = request.for_conversation(id);
        }

        match self.complete(provider.as_ref(), request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = %provider.provider_info().name,
                    conversation_id = ?conversation_id,
                    "reply generation failed, using fallback"
                );
                FALLBACK_REPLY.to_string()
            }
        }
    }

    async fn complete(
        &self,
        provider: &dyn AIProvider,
        request: CompletionRequest,
    ) -> Result<String, AIError> {
        let response = match self.settings.deadline {
            Some(deadline) => tokio::time::timeout(deadline, provider.complete(request))
                .await
                .map_err(|_| AIError::timed_out(deadline))??,
            None => provider.complete(request).await?,
        };

        let text = response.content.trim();
        if text.is_empty() {
            return Err(AIError::EmptyCompletion);
        }
        Ok(text.to_string())
    }
}

/// Prospect turns are the user; AI and agent turns are both "already said".
pub fn to_chat_turns(history: &[Message]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|m| match m.sender_type {
            SenderType::Prospect => ChatMessage::user(&m.content),
            SenderType::Ai | SenderType::Agent => ChatMessage::assistant(&m.content),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockAIProvider, MockError};
    use crate::domain::foundation::AgentId;

    fn generator(provider: MockAIProvider) -> ResponseGenerator {
        ResponseGenerator::new(Some(Arc::new(provider)))
    }

    #[tokio::test]
    async fn returns_model_reply() {
        let provider = MockAIProvider::new().with_response("  We have a 2 bed in Lekki.  ");
        let reply = generator(provider).generate("sys", &[], "2 bed?", None).await;
        assert_eq!(reply, "We have a 2 bed in Lekki.");
    }

    #[tokio::test]
    async fn request_carries_prompt_history_and_new_message() {
        let provider = MockAIProvider::new().with_response("ok");
        let id = ConversationId::new();
        let history = vec![
            Message::from_prospect(id, "Hi"),
            Message::from_ai(id, "Hello!"),
            Message::from_agent(id, &AgentId::new("a-1").unwrap(), "Agent here"),
        ];

        generator(provider.clone())
            .generate("grounded prompt", &history, "Any 2 bed?", Some(id))
            .await;

        let call = &provider.get_calls()[0];
        assert_eq!(call.system_prompt.as_deref(), Some("grounded prompt"));
        let roles: Vec<_> = call.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ChatRole::User, ChatRole::Assistant, ChatRole::Assistant, ChatRole::User]
        );
        assert_eq!(call.messages[3].content, "Any 2 bed?");
        assert_eq!(call.conversation_id, Some(id));
    }

    #[tokio::test]
    async fn provider_error_falls_back() {
        let provider = MockAIProvider::new().with_error(MockError::Network {
            message: "reset".into(),
        });
        let reply = generator(provider).generate("sys", &[], "hi", None).await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn blank_completion_falls_back() {
        let provider = MockAIProvider::new().with_response("   ");
        let reply = generator(provider).generate("sys", &[], "hi", None).await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn missing_provider_falls_back_every_time() {
        let generator = ResponseGenerator::new(None);
        assert!(!generator.is_available());
        assert_eq!(generator.generate("s", &[], "a", None).await, FALLBACK_REPLY);
        assert_eq!(generator.generate("s", &[], "b", None).await, FALLBACK_REPLY);
        assert!(generator.unavailable_logged.load(Ordering::Relaxed));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_falls_back() {
        let provider = MockAIProvider::new()
            .with_response("too late")
            .with_delay(Duration::from_secs(30));
        let reply = generator(provider)
            .with_deadline(Duration::from_secs(5))
            .generate("sys", &[], "hi", None)
            .await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_deadline_reports_one_second() {
        let provider = MockAIProvider::new()
            .with_response("too late")
            .with_delay(Duration::from_secs(1));
        let generator = generator(provider).with_deadline(Duration::from_millis(50));
        let err = generator
            .complete(generator.provider.as_deref().unwrap(), CompletionRequest::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AIError::Timeout { timeout_secs: 1 }));
    }
}
