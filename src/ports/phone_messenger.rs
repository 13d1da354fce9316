//! Phone messenger port - sends text over the phone-network messaging API.

use async_trait::async_trait;
use thiserror::Error;

/// Sends one text message to a phone number.
#[async_trait]
pub trait PhoneMessenger: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), MessagingError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    #[error("messaging API rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("messaging API authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
}

impl MessagingError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}
