//! Event infrastructure shared by every aggregate.
//!
//! - `EventId` - unique identifier for one emitted event
//! - `EventMetadata` - correlation context carried alongside the payload
//! - `EventEnvelope` - transport wrapper handed to publishers and subscribers
//! - `DomainEvent` - trait implemented by concrete events
//! - `domain_event!` - macro that implements `DomainEvent` from field names

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

use super::Timestamp;

/// Contract every domain event fulfils so it can be routed and ordered.
///
/// Implement it with the `domain_event!` macro rather than by hand.
pub trait DomainEvent: Send + Sync {
    /// Routing key, e.g. `"conversation.created.v1"`.
    fn event_type(&self) -> &'static str;

    fn aggregate_id(&self) -> String;

    fn aggregate_type(&self) -> &'static str;

    fn occurred_at(&self) -> Timestamp;

    fn event_id(&self) -> EventId;
}

/// Implements `DomainEvent` for a struct by naming its fields.
///
/// ```ignore
/// domain_event!(
///     ConversationCreated,
///     event_type = "conversation.created.v1",
///     aggregate_id = conversation_id,
///     aggregate_type = "Conversation",
///     occurred_at = created_at,
///     event_id = event_id
/// );
/// ```
#[macro_export]
macro_rules! domain_event {
    (
        $event_name:ident,
        event_type = $event_type:expr,
        aggregate_id = $agg_id_field:ident,
        aggregate_type = $agg_type:expr,
        occurred_at = $occurred_field:ident,
        event_id = $event_id_field:ident
    ) => {
        impl $crate::domain::foundation::DomainEvent for $event_name {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn aggregate_id(&self) -> String {
                self.$agg_id_field.to_string()
            }

            fn aggregate_type(&self) -> &'static str {
                $agg_type
            }

            fn occurred_at(&self) -> $crate::domain::foundation::Timestamp {
                self.$occurred_field
            }

            fn event_id(&self) -> $crate::domain::foundation::EventId {
                self.$event_id_field.clone()
            }
        }
    };
}

pub use crate::domain_event;

/// Unique identifier for one emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation context for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Agent whose action produced the event, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

/// Transport envelope for domain events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: EventId,

    /// Routing key, e.g. `"conversation.status_changed.v1"`.
    pub event_type: String,

    /// Schema version parsed from the `.vN` suffix of `event_type`.
    pub schema_version: u32,

    pub aggregate_id: String,

    pub aggregate_type: String,

    pub occurred_at: Timestamp,

    pub payload: JsonValue,

    pub metadata: EventMetadata,
}

impl EventEnvelope {
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        aggregate_type: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        let event_type = event_type.into();
        let schema_version = Self::extract_version(&event_type);

        Self {
            event_id: EventId::new(),
            event_type,
            schema_version,
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            occurred_at: Timestamp::now(),
            payload,
            metadata: EventMetadata::default(),
        }
    }

    /// Wraps a domain event, serializing it as the payload.
    pub fn from_event<T>(event: &T) -> Result<Self, serde_json::Error>
    where
        T: DomainEvent + Serialize,
    {
        let event_type = event.event_type().to_string();
        let schema_version = Self::extract_version(&event_type);

        Ok(Self {
            event_id: event.event_id(),
            event_type,
            schema_version,
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_string(),
            occurred_at: event.occurred_at(),
            payload: serde_json::to_value(event)?,
            metadata: EventMetadata::default(),
        })
    }

    fn extract_version(event_type: &str) -> u32 {
        event_type
            .rsplit_once(".v")
            .and_then(|(_, version)| version.parse::<u32>().ok())
            .unwrap_or(1)
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    pub fn with_agent_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.agent_id = Some(id.into());
        self
    }

    /// Deserializes the payload back into a concrete event type.
    pub fn payload_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Pinged {
        event_id: EventId,
        thing_id: String,
        at: Timestamp,
    }

    domain_event!(
        Pinged,
        event_type = "thing.pinged.v2",
        aggregate_id = thing_id,
        aggregate_type = "Thing",
        occurred_at = at,
        event_id = event_id
    );

    #[test]
    fn new_envelope_defaults_to_version_one() {
        let env = EventEnvelope::new("legacy.event", "a-1", "Thing", json!({}));
        assert_eq!(env.schema_version, 1);
    }

    #[test]
    fn from_event_copies_routing_fields() {
        let event = Pinged {
            event_id: EventId::from_string("evt-1"),
            thing_id: "thing-9".into(),
            at: Timestamp::now(),
        };

        let env = EventEnvelope::from_event(&event).unwrap();

        assert_eq!(env.event_type, "thing.pinged.v2");
        assert_eq!(env.schema_version, 2);
        assert_eq!(env.aggregate_id, "thing-9");
        assert_eq!(env.aggregate_type, "Thing");
        assert_eq!(env.event_id.as_str(), "evt-1");

        let back: Pinged = env.payload_as().unwrap();
        assert_eq!(back.thing_id, "thing-9");
    }

    #[test]
    fn metadata_builders_set_fields() {
        let env = EventEnvelope::new("x.v1", "a", "T", json!(null))
            .with_correlation_id("corr")
            .with_agent_id("agent-1");
        assert_eq!(env.metadata.correlation_id.as_deref(), Some("corr"));
        assert_eq!(env.metadata.agent_id.as_deref(), Some("agent-1"));
    }

    #[test]
    fn empty_metadata_is_omitted_from_json() {
        let env = EventEnvelope::new("x.v1", "a", "T", json!(null));
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["metadata"], json!({}));
    }
}
