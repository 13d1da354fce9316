//! Outbound channel adapter.
//!
//! Phone conversations are delivered through the messaging API. Web chats
//! need nothing here: the realtime `reply` event reaches the widget.

use std::sync::Arc;

use crate::domain::conversation::ProspectIdentity;
use crate::ports::{MessagingError, PhoneMessenger};

pub struct OutboundChannelAdapter {
    messenger: Arc<dyn PhoneMessenger>,
}

impl OutboundChannelAdapter {
    pub fn new(messenger: Arc<dyn PhoneMessenger>) -> Self {
        Self { messenger }
    }

    pub async fn send(&self, destination: &ProspectIdentity, text: &str) -> Result<(), MessagingError> {
        match destination {
            ProspectIdentity::Phone { phone_number } => {
                self.messenger.send_text(phone_number, text).await?;
                tracing::debug!(channel = "phone", "reply delivered");
                Ok(())
            }
            ProspectIdentity::Web { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::messaging::RecordingMessenger;

    #[tokio::test]
    async fn phone_goes_through_messenger() {
        let messenger = RecordingMessenger::new();
        let adapter = OutboundChannelAdapter::new(Arc::new(messenger.clone()));

        adapter
            .send(&ProspectIdentity::phone("+2348000000001").unwrap(), "Hello")
            .await
            .unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "+2348000000001");
        assert_eq!(sent[0].text, "Hello");
    }

    #[tokio::test]
    async fn web_is_a_noop() {
        let messenger = RecordingMessenger::new();
        let adapter = OutboundChannelAdapter::new(Arc::new(messenger.clone()));

        adapter
            .send(&ProspectIdentity::web("sess-123").unwrap(), "Hello")
            .await
            .unwrap();
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn messenger_failure_surfaces() {
        let messenger = RecordingMessenger::new();
        messenger.fail_with(Some(MessagingError::AuthenticationFailed));
        let adapter = OutboundChannelAdapter::new(Arc::new(messenger));

        let err = adapter
            .send(&ProspectIdentity::phone("+2348000000001").unwrap(), "Hello")
            .await
            .unwrap_err();
        assert_eq!(err, MessagingError::AuthenticationFailed);
    }
}
