//! Phone messaging API configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Versioned Graph-style API root, e.g. `https://graph.facebook.com/v18.0`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token for the business account
    #[serde(default)]
    pub access_token: String,

    /// Phone-number id replies are sent from
    #[serde(default)]
    pub sender_id: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl MessagingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether phone replies can actually be sent.
    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty() && !self.sender_id.is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidMessagingUrl);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            access_token: String::new(),
            sender_id: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_timeout() -> u64 {
    15
}
