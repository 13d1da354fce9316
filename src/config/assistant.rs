//! Assistant persona and conversation window

use serde::Deserialize;

use crate::application::DEFAULT_HISTORY_LIMIT;
use crate::domain::conversation::PromptSettings;

use super::error::ValidationError;

const MAX_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Business the assistant speaks for
    #[serde(default = "default_business_name")]
    pub business_name: String,

    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,

    /// Prefix used when quoting prices
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Prior messages sent to the model with each new one
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl AssistantConfig {
    pub fn prompt_settings(&self) -> PromptSettings {
        PromptSettings {
            business_name: self.business_name.clone(),
            assistant_name: self.assistant_name.clone(),
            currency_symbol: self.currency_symbol.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_limit == 0 || self.history_limit > MAX_HISTORY_LIMIT {
            return Err(ValidationError::InvalidHistoryLimit);
        }
        Ok(())
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        let prompt = PromptSettings::default();
        Self {
            business_name: prompt.business_name,
            assistant_name: prompt.assistant_name,
            currency_symbol: prompt.currency_symbol,
            history_limit: default_history_limit(),
        }
    }
}

fn default_business_name() -> String {
    PromptSettings::default().business_name
}

fn default_assistant_name() -> String {
    PromptSettings::default().assistant_name
}

fn default_currency_symbol() -> String {
    PromptSettings::default().currency_symbol
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_prompt_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.history_limit, 20);
        let settings = config.prompt_settings();
        assert_eq!(settings.currency_symbol, PromptSettings::default().currency_symbol);
    }

    #[test]
    fn test_history_limit_bounds() {
        let zero = AssistantConfig {
            history_limit: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let huge = AssistantConfig {
            history_limit: 1_000,
            ..Default::default()
        };
        assert!(huge.validate().is_err());
    }
}
