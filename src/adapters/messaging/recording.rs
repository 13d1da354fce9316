//! Phone messenger that records sends instead of delivering them.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ports::{MessagingError, PhoneMessenger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub to: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingMessenger {
    sent: Arc<Mutex<Vec<SentText>>>,
    failure: Arc<Mutex<Option<MessagingError>>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later send fails with `error` until cleared with `None`.
    pub fn fail_with(&self, error: Option<MessagingError>) {
        *lock(&self.failure) = error;
    }

    pub fn sent(&self) -> Vec<SentText> {
        lock(&self.sent).clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<String> {
        lock(&self.sent)
            .iter()
            .filter(|s| s.to == to)
            .map(|s| s.text.clone())
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl PhoneMessenger for RecordingMessenger {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), MessagingError> {
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }
        lock(&self.sent).push(SentText {
            to: to.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_fails_on_demand() {
        let messenger = RecordingMessenger::new();
        messenger.send_text("+1", "hello").await.unwrap();
        assert_eq!(messenger.sent_to("+1"), vec!["hello".to_string()]);

        messenger.fail_with(Some(MessagingError::network("down")));
        assert!(messenger.send_text("+1", "again").await.is_err());
        assert_eq!(messenger.sent().len(), 1);
    }
}
