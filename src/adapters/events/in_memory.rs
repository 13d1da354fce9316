//! In-process event bus.
//!
//! Handlers run inline on the publisher's task, in subscription order, so
//! events for one conversation reach every handler in the order they were
//! published. Optionally keeps a copy of each event for assertions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// In-process event bus.
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::recording());
/// bus.publish(envelope).await?;
/// assert!(bus.has_event(STATUS_CHANGED));
/// ```
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: Option<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventBus {
    /// Bus that dispatches without keeping history.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: None,
        }
    }

    /// Bus that also records every published event.
    pub fn recording() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            published: Some(RwLock::new(Vec::new())),
        }
    }

    // === Inspection ===

    /// Everything published so far. Empty unless built with `recording()`.
    pub fn published_events(&self) -> Vec<EventEnvelope> {
        match &self.published {
            Some(log) => log.read().unwrap_or_else(|e| e.into_inner()).clone(),
            None => Vec::new(),
        }
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.published_events()
            .into_iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published
            .as_ref()
            .map_or(0, |log| log.read().unwrap_or_else(|e| e.into_inner()).len())
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        !self.events_of_type(event_type).is_empty()
    }

    pub fn clear(&self) {
        if let Some(log) = &self.published {
            log.write().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if let Some(log) = &self.published {
            log.write()
                .unwrap_or_else(|e| e.into_inner())
                .push(event.clone());
        }

        // Snapshot handlers so no lock is held across an await.
        let type_handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        let mut errors = Vec::new();
        for handler in type_handlers {
            if let Err(e) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "event handler failed"
                );
                errors.push(format!("{}: {}", handler.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Handler errors: {}", errors.join(", ")),
            ));
        }

        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn envelope(event_type: &str, aggregate_id: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, aggregate_id, "Conversation", json!({"n": 1}))
    }

    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}@{}", event.event_type, event.aggregate_id));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "Recorder"
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle(&self, _event: EventEnvelope) -> Result<(), DomainError> {
            Err(DomainError::new(ErrorCode::InternalError, "boom"))
        }

        fn name(&self) -> &'static str {
            "Failing"
        }
    }

    #[tokio::test]
    async fn plain_bus_does_not_record() {
        let bus = InMemoryEventBus::new();
        bus.publish(envelope("a.v1", "c1")).await.unwrap();
        assert_eq!(bus.event_count(), 0);
        assert!(bus.published_events().is_empty());
    }

    #[tokio::test]
    async fn recording_bus_captures_events() {
        let bus = InMemoryEventBus::recording();
        bus.publish(envelope("a.v1", "c1")).await.unwrap();
        bus.publish(envelope("b.v1", "c2")).await.unwrap();

        assert_eq!(bus.event_count(), 2);
        assert!(bus.has_event("a.v1"));
        assert!(!bus.has_event("z.v1"));
        assert_eq!(bus.events_for_aggregate("c2").len(), 1);

        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }

    #[tokio::test]
    async fn handlers_receive_only_subscribed_types_in_order() {
        let bus = InMemoryEventBus::new();
        let recorder = Recorder::new();
        bus.subscribe_all(&["a.v1", "b.v1"], recorder.clone());

        bus.publish(envelope("a.v1", "c1")).await.unwrap();
        bus.publish(envelope("x.v1", "c1")).await.unwrap();
        bus.publish(envelope("b.v1", "c1")).await.unwrap();
        bus.publish(envelope("a.v1", "c2")).await.unwrap();

        assert_eq!(recorder.seen(), vec!["a.v1@c1", "b.v1@c1", "a.v1@c2"]);
        assert_eq!(bus.handler_count("a.v1"), 1);
    }

    #[tokio::test]
    async fn failing_handler_does_not_starve_others() {
        let bus = InMemoryEventBus::new();
        let recorder = Recorder::new();
        bus.subscribe("a.v1", Arc::new(Failing));
        bus.subscribe("a.v1", recorder.clone());

        let result = bus.publish(envelope("a.v1", "c1")).await;

        assert!(result.is_err());
        assert_eq!(recorder.seen(), vec!["a.v1@c1"]);
    }
}
