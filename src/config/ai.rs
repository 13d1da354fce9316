//! Language-model configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Language-model provider settings.
///
/// Keys are optional. Without one the assistant answers every prospect
/// with the fixed fallback reply and lead extraction is skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub openai_api_key: Option<String>,

    pub anthropic_api_key: Option<String>,

    /// Provider tried first when both keys are present
    #[serde(default)]
    pub primary_provider: AiProvider,

    /// Model name override for the selected provider
    pub model: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries on rate limits and transient failures
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Upper bound on one reply generation, retries included
    pub generation_deadline_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    OpenAI,
    Anthropic,
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn generation_deadline(&self) -> Option<Duration> {
        self.generation_deadline_secs.map(Duration::from_secs)
    }

    pub fn has_openai(&self) -> bool {
        self.openai_api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    pub fn has_anthropic(&self) -> bool {
        self.anthropic_api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// The provider to build, preferring `primary_provider` and falling
    /// back to whichever key is present.
    pub fn selected_provider(&self) -> Option<AiProvider> {
        let available = |p: AiProvider| match p {
            AiProvider::OpenAI => self.has_openai(),
            AiProvider::Anthropic => self.has_anthropic(),
        };
        let secondary = match self.primary_provider {
            AiProvider::OpenAI => AiProvider::Anthropic,
            AiProvider::Anthropic => AiProvider::OpenAI,
        };
        [self.primary_provider, secondary]
            .into_iter()
            .find(|p| available(*p))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.generation_deadline_secs == Some(0) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            primary_provider: AiProvider::default(),
            model: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            generation_deadline_secs: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}
