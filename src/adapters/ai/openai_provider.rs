//! OpenAI chat completions provider.
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key).with_model("gpt-4o-mini");
//! let provider = OpenAIProvider::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::http_support::{check_status, map_send_error, with_retries};
use crate::ports::{
    AIError, AIProvider, ChatRole, CompletionRequest, CompletionResponse, FinishReason,
    ProviderInfo, TokenUsage,
};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_base_delay: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::unavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        let system = request.system_prompt.iter().map(|prompt| OpenAIMessage {
            role: ChatRole::System.as_str().to_string(),
            content: prompt.clone(),
        });
        let turns = request.messages.iter().map(|msg| OpenAIMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        });

        OpenAIRequest {
            model: self.config.model.clone(),
            messages: system.chain(turns).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    async fn attempt(&self, body: &OpenAIRequest) -> Result<CompletionResponse, AIError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .json(body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.config.timeout))?;

        let response = check_status(response, 30).await?;
        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        into_completion(parsed)
    }
}

fn into_completion(parsed: OpenAIResponse) -> Result<CompletionResponse, AIError> {
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AIError::parse("No choices in response"))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    };

    let content = choice.message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(AIError::EmptyCompletion);
    }

    Ok(CompletionResponse {
        content,
        usage: parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default(),
        model: parsed.model,
        finish_reason,
    })
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let body = self.to_openai_request(&request);
        with_retries(self.config.max_retries, self.config.retry_base_delay, || {
            self.attempt(&body)
        })
        .await
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("openai", &self.config.model)
    }
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ChatMessage;

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::new("test-key")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com/v1/")
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(5);

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.api_key(), "test-key");

        let provider = OpenAIProvider::new(config).unwrap();
        assert_eq!(provider.completions_url(), "https://custom.api.com/v1/chat/completions");
    }

    #[test]
    fn system_prompt_leads_the_message_list() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k")).unwrap();
        let request = CompletionRequest::new()
            .with_system_prompt("You are helpful")
            .with_messages(vec![
                ChatMessage::user("Hi"),
                ChatMessage::assistant("Hello"),
                ChatMessage::user("2 bed?"),
            ])
            .with_temperature(0.2);

        let body = serde_json::to_value(provider.to_openai_request(&request)).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are helpful");
        assert_eq!(body["messages"][2]["role"], "assistant");
        assert_eq!(body["messages"][3]["content"], "2 bed?");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parses_completion() {
        let parsed: OpenAIResponse = serde_json::from_str(
            r#"{"model": "gpt-4o-mini", "choices": [{"message": {"role": "assistant", "content": "Yes we do."}, "finish_reason": "stop"}], "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}}"#,
        )
        .unwrap();

        let completion = into_completion(parsed).unwrap();
        assert_eq!(completion.content, "Yes we do.");
        assert_eq!(completion.usage.total_tokens, 16);
        assert_eq!(completion.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn empty_content_is_an_error() {
        let parsed: OpenAIResponse = serde_json::from_str(
            r#"{"model": "m", "choices": [{"message": {"content": null}, "finish_reason": "stop"}]}"#,
        )
        .unwrap();
        assert!(matches!(into_completion(parsed), Err(AIError::EmptyCompletion)));
    }

    #[test]
    fn no_choices_is_a_parse_error() {
        let parsed: OpenAIResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(matches!(into_completion(parsed), Err(AIError::Parse(_))));
    }

    #[test]
    fn reports_provider_info() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k").with_model("gpt-4o")).unwrap();
        assert_eq!(provider.provider_info(), ProviderInfo::new("openai", "gpt-4o"));
    }
}
