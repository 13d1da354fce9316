//! Phone-network messaging over a Graph-style cloud API.
//!
//! Text messages are posted to `{base_url}/{sender_id}/messages` with a
//! bearer token.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{MessagingError, PhoneMessenger};

#[derive(Debug, Clone)]
pub struct CloudApiConfig {
    pub base_url: String,
    access_token: Secret<String>,
    /// The business phone-number id messages are sent from.
    pub sender_id: String,
    pub timeout: Duration,
}

impl CloudApiConfig {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: Secret::new(access_token.into()),
            sender_id: sender_id.into(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct CloudApiMessenger {
    config: CloudApiConfig,
    client: Client,
}

impl CloudApiMessenger {
    pub fn new(config: CloudApiConfig) -> Result<Self, MessagingError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MessagingError::network(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            self.config.sender_id
        )
    }
}

fn text_payload<'a>(to: &'a str, text: &'a str) -> SendTextRequest<'a> {
    SendTextRequest {
        messaging_product: "whatsapp",
        recipient_type: "individual",
        to: to.trim_start_matches('+'),
        message_type: "text",
        text: TextBody { body: text },
    }
}

fn classify_failure(status: u16, body: &str) -> MessagingError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 | 403 => MessagingError::AuthenticationFailed,
        _ => MessagingError::Rejected { status, message },
    }
}

#[async_trait]
impl PhoneMessenger for CloudApiMessenger {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), MessagingError> {
        if to.trim().is_empty() {
            return Err(MessagingError::InvalidRecipient(to.to_string()));
        }

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&text_payload(to, text))
            .send()
            .await
            .map_err(|e| MessagingError::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(recipient = %to, "phone message accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &body))
    }
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_includes_sender_id() {
        let messenger = CloudApiMessenger::new(CloudApiConfig::new(
            "https://graph.facebook.com/v19.0/",
            "token",
            "1234567890",
        ))
        .unwrap();
        assert_eq!(
            messenger.messages_url(),
            "https://graph.facebook.com/v19.0/1234567890/messages"
        );
    }

    #[test]
    fn payload_shape() {
        let payload = serde_json::to_value(text_payload("+2348000000001", "Hello")).unwrap();
        assert_eq!(payload["to"], "2348000000001");
        assert_eq!(payload["type"], "text");
        assert_eq!(payload["text"]["body"], "Hello");
        assert_eq!(payload["messaging_product"], "whatsapp");
    }

    #[test]
    fn failures_are_classified() {
        assert_eq!(classify_failure(401, ""), MessagingError::AuthenticationFailed);
        assert_eq!(
            classify_failure(400, r#"{"error": {"message": "Invalid parameter"}}"#),
            MessagingError::Rejected {
                status: 400,
                message: "Invalid parameter".into()
            }
        );
        assert_eq!(
            classify_failure(500, "oops"),
            MessagingError::Rejected {
                status: 500,
                message: "oops".into()
            }
        );
    }

    #[tokio::test]
    async fn blank_recipient_is_rejected_locally() {
        let messenger =
            CloudApiMessenger::new(CloudApiConfig::new("http://localhost", "t", "s")).unwrap();
        assert!(matches!(
            messenger.send_text(" ", "hi").await,
            Err(MessagingError::InvalidRecipient(_))
        ));
    }
}
