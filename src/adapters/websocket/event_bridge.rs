//! Bridge from conversation domain events to WebSocket rooms.
//!
//! ```text
//! conversation.created        → agents, conversation room
//! conversation.message_recorded → agents, conversation room
//!                               (+ `reply` to the conversation room for
//!                                 outbound messages on web chats)
//! conversation.status_changed → agents, conversation room
//! ```
//!
//! The bus dispatches in publish order and this handler broadcasts before
//! returning, so one conversation's events reach its rooms in the order the
//! orchestrator finished the operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::conversation::events::{
    ALL_CONVERSATION_EVENTS, CONVERSATION_CREATED, MESSAGE_RECORDED, STATUS_CHANGED,
};
use crate::domain::conversation::{Channel, MessageRecorded};
use crate::domain::foundation::{ConversationId, DomainError, EventEnvelope};
use crate::ports::{EventHandler, EventSubscriber};

use super::messages::{ConversationEventMessage, ReplyMessage, ServerMessage};
use super::rooms::{Room, RoomManager};

pub struct WebSocketEventBridge {
    room_manager: Arc<RoomManager>,
}

impl WebSocketEventBridge {
    pub fn new(room_manager: Arc<RoomManager>) -> Self {
        Self { room_manager }
    }

    pub fn new_shared(room_manager: Arc<RoomManager>) -> Arc<Self> {
        Arc::new(Self::new(room_manager))
    }

    /// Subscribes the bridge to every conversation event.
    pub fn register(self: &Arc<Self>, subscriber: &impl EventSubscriber) {
        subscriber.subscribe_all(ALL_CONVERSATION_EVENTS, self.clone());
    }

    /// Works out which rooms get which message for `event`.
    fn route(&self, event: &EventEnvelope) -> Vec<(Room, ServerMessage)> {
        let Ok(conversation_id) = event.aggregate_id.parse::<ConversationId>() else {
            tracing::debug!(
                event_type = %event.event_type,
                aggregate_id = %event.aggregate_id,
                "event without a conversation id, skipping broadcast"
            );
            return Vec::new();
        };
        let room = Room::Conversation(conversation_id);

        let body = ConversationEventMessage {
            conversation_id: event.aggregate_id.clone(),
            data: event.payload.clone(),
            timestamp: event.occurred_at.as_datetime().to_rfc3339(),
            correlation_id: event.metadata.correlation_id.clone(),
        };

        match event.event_type.as_str() {
            CONVERSATION_CREATED => vec![
                (Room::Agents, ServerMessage::ConversationCreated(body.clone())),
                (room, ServerMessage::ConversationCreated(body)),
            ],
            MESSAGE_RECORDED => {
                let mut routed = vec![
                    (Room::Agents, ServerMessage::NewMessage(body.clone())),
                    (room, ServerMessage::NewMessage(body)),
                ];
                if let Some(reply) = widget_reply(event) {
                    routed.push((room, reply));
                }
                routed
            }
            STATUS_CHANGED => vec![
                (Room::Agents, ServerMessage::StatusChanged(body.clone())),
                (room, ServerMessage::StatusChanged(body)),
            ],
            _ => Vec::new(),
        }
    }
}

/// The web widget only renders what was said to the prospect.
fn widget_reply(event: &EventEnvelope) -> Option<ServerMessage> {
    let recorded: MessageRecorded = match event.payload_as() {
        Ok(recorded) => recorded,
        Err(e) => {
            tracing::warn!(error = %e, event_id = %event.event_id, "malformed message event");
            return None;
        }
    };

    if recorded.channel != Channel::Web || !recorded.message.is_outbound() {
        return None;
    }

    Some(ServerMessage::Reply(ReplyMessage {
        conversation_id: recorded.conversation_id.to_string(),
        message_id: recorded.message.id.to_string(),
        sender: recorded.sender.as_str().to_string(),
        content: recorded.message.content,
        timestamp: recorded.message.created_at.as_datetime().to_rfc3339(),
    }))
}

#[async_trait]
impl EventHandler for WebSocketEventBridge {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        for (room, message) in self.route(&event) {
            let reached = self.room_manager.broadcast(room, message).await;
            tracing::trace!(event_type = %event.event_type, %room, reached, "broadcast");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "WebSocketEventBridge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::websocket::rooms::ClientId;
    use crate::domain::conversation::{
        Conversation, ConversationCreated, Message, ProspectIdentity, StatusChanged,
    };
    use crate::domain::foundation::AgentId;
    use crate::ports::EventPublisher;
    use tokio::sync::broadcast::error::TryRecvError;

    fn web_conversation() -> Conversation {
        Conversation::open(ProspectIdentity::web("sess-123").unwrap())
    }

    fn envelope<T: crate::domain::foundation::DomainEvent + serde::Serialize>(
        event: &T,
    ) -> EventEnvelope {
        EventEnvelope::from_event(event).unwrap()
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(msg) => out.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return out,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[test]
    fn created_goes_to_agents_and_conversation_room() {
        let bridge = WebSocketEventBridge::new(Arc::new(RoomManager::default()));
        let c = web_conversation();
        let routed = bridge.route(&envelope(&ConversationCreated::from_conversation(&c)));

        assert_eq!(routed.len(), 2);
        assert_eq!(routed[0].0, Room::Agents);
        assert!(matches!(routed[0].1, ServerMessage::ConversationCreated(_)));
        assert_eq!(routed[1].0, Room::Conversation(c.id()));
    }

    #[test]
    fn web_outbound_message_adds_reply() {
        let bridge = WebSocketEventBridge::new(Arc::new(RoomManager::default()));
        let c = web_conversation();
        let event = MessageRecorded::new(c.channel(), Message::from_ai(c.id(), "We have one"));
        let routed = bridge.route(&envelope(&event));

        assert_eq!(routed.len(), 3);
        match &routed[2] {
            (room, ServerMessage::Reply(reply)) => {
                assert_eq!(*room, Room::Conversation(c.id()));
                assert_eq!(reply.content, "We have one");
                assert_eq!(reply.sender, "ai");
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[test]
    fn prospect_message_on_web_has_no_reply() {
        let bridge = WebSocketEventBridge::new(Arc::new(RoomManager::default()));
        let c = web_conversation();
        let event = MessageRecorded::new(c.channel(), Message::from_prospect(c.id(), "Hi"));
        let routed = bridge.route(&envelope(&event));
        assert!(routed
            .iter()
            .all(|(_, msg)| !matches!(msg, ServerMessage::Reply(_))));
    }

    #[test]
    fn phone_messages_have_no_reply() {
        let bridge = WebSocketEventBridge::new(Arc::new(RoomManager::default()));
        let c = Conversation::open(ProspectIdentity::phone("+2348000000001").unwrap());
        let event = MessageRecorded::new(c.channel(), Message::from_ai(c.id(), "Hello"));
        assert_eq!(bridge.route(&envelope(&event)).len(), 2);
    }

    #[tokio::test]
    async fn events_flow_from_bus_to_rooms_in_order() {
        let rooms = Arc::new(RoomManager::default());
        let bus = InMemoryEventBus::new();
        WebSocketEventBridge::new_shared(rooms.clone()).register(&bus);

        let mut c = web_conversation();
        let mut agents = rooms.join(Room::Agents, ClientId::new()).await;
        let mut watcher = rooms.join(Room::Conversation(c.id()), ClientId::new()).await;

        let before = c.status();
        c.take_over(AgentId::new("a-1").unwrap()).unwrap();
        bus.publish(envelope(&StatusChanged::new(before, &c))).await.unwrap();
        let agent_msg = Message::from_agent(c.id(), &AgentId::new("a-1").unwrap(), "Hi, Tolu here");
        bus.publish(envelope(&MessageRecorded::new(c.channel(), agent_msg)))
            .await
            .unwrap();

        let seen = drain(&mut watcher);
        assert!(matches!(seen[0], ServerMessage::StatusChanged(_)));
        assert!(matches!(seen[1], ServerMessage::NewMessage(_)));
        assert!(matches!(seen[2], ServerMessage::Reply(_)));

        assert_eq!(drain(&mut agents).len(), 2);
    }
}
