//! Room membership for realtime fan-out.
//!
//! ```text
//! Room: agents              Room: conversation-123
//! ├── dashboard-a           ├── dashboard-a
//! └── dashboard-b           └── widget-x
//! ```
//!
//! Each room owns a broadcast channel. A client may sit in several rooms at
//! once; the socket handler merges their receivers into one outbound queue.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::foundation::ConversationId;

use super::messages::ServerMessage;

/// Server-side id for one socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A broadcast audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Every dashboard connection.
    Agents,
    /// Subscribers of a single conversation.
    Conversation(ConversationId),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Agents => write!(f, "agents"),
            Room::Conversation(id) => write!(f, "conversation:{}", id),
        }
    }
}

struct RoomEntry {
    sender: broadcast::Sender<ServerMessage>,
    members: HashSet<ClientId>,
}

/// Registry of rooms and their members.
///
/// Rooms are created on first join and dropped when the last member leaves.
/// Broadcasts to a room nobody has joined are a no-op.
pub struct RoomManager {
    rooms: RwLock<HashMap<Room, RoomEntry>>,
    client_rooms: RwLock<HashMap<ClientId, HashSet<Room>>>,
    /// Per-room buffer; slow clients past this lose the oldest messages.
    channel_capacity: usize,
}

impl RoomManager {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            client_rooms: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Adds `client_id` to `room` and returns a receiver for its broadcasts.
    pub async fn join(&self, room: Room, client_id: ClientId) -> broadcast::Receiver<ServerMessage> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms.entry(room).or_insert_with(|| {
            let (sender, _) = broadcast::channel(self.channel_capacity);
            RoomEntry {
                sender,
                members: HashSet::new(),
            }
        });
        entry.members.insert(client_id);
        let receiver = entry.sender.subscribe();
        drop(rooms);

        self.client_rooms
            .write()
            .await
            .entry(client_id)
            .or_default()
            .insert(room);

        receiver
    }

    /// Removes `client_id` from `room`, dropping the room if it empties.
    pub async fn leave(&self, room: Room, client_id: ClientId) {
        self.remove_member(room, client_id).await;

        let mut client_rooms = self.client_rooms.write().await;
        if let Some(joined) = client_rooms.get_mut(&client_id) {
            joined.remove(&room);
            if joined.is_empty() {
                client_rooms.remove(&client_id);
            }
        }
    }

    /// Removes `client_id` from every room. Called on disconnect.
    pub async fn leave_all(&self, client_id: ClientId) {
        let joined = self.client_rooms.write().await.remove(&client_id);
        for room in joined.into_iter().flatten() {
            self.remove_member(room, client_id).await;
        }
    }

    async fn remove_member(&self, room: Room, client_id: ClientId) {
        let mut rooms = self.rooms.write().await;
        if let Some(entry) = rooms.get_mut(&room) {
            entry.members.remove(&client_id);
            if entry.members.is_empty() {
                rooms.remove(&room);
            }
        }
    }

    /// Sends `message` to every member of `room`. Returns how many
    /// receivers it reached.
    pub async fn broadcast(&self, room: Room, message: ServerMessage) -> usize {
        let rooms = self.rooms.read().await;
        match rooms.get(&room) {
            Some(entry) => entry.sender.send(message).unwrap_or(0),
            None => 0,
        }
    }

    pub async fn is_member(&self, room: Room, client_id: ClientId) -> bool {
        self.rooms
            .read()
            .await
            .get(&room)
            .map_or(false, |entry| entry.members.contains(&client_id))
    }

    pub async fn client_count(&self, room: Room) -> usize {
        self.rooms
            .read()
            .await
            .get(&room)
            .map_or(0, |entry| entry.members.len())
    }

    pub async fn active_rooms(&self) -> Vec<Room> {
        self.rooms.read().await.keys().copied().collect()
    }

    /// Clients currently in at least one room.
    pub async fn total_client_count(&self) -> usize {
        self.client_rooms.read().await.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation_room() -> Room {
        Room::Conversation(ConversationId::new())
    }

    #[tokio::test]
    async fn join_creates_room_and_receives_broadcasts() {
        let manager = RoomManager::default();
        let mut rx = manager.join(Room::Agents, ClientId::new()).await;

        assert_eq!(manager.broadcast(Room::Agents, ServerMessage::pong()).await, 1);
        assert!(matches!(rx.recv().await.unwrap(), ServerMessage::Pong(_)));
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let manager = RoomManager::default();
        let room_a = conversation_room();
        let room_b = conversation_room();
        let mut rx_a = manager.join(room_a, ClientId::new()).await;
        let mut rx_b = manager.join(room_b, ClientId::new()).await;

        manager.broadcast(room_a, ServerMessage::pong()).await;

        assert!(rx_a.recv().await.is_ok());
        assert!(matches!(
            rx_b.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn one_client_can_sit_in_several_rooms() {
        let manager = RoomManager::default();
        let client = ClientId::new();
        let room = conversation_room();
        let _agents = manager.join(Room::Agents, client).await;
        let _conv = manager.join(room, client).await;

        assert!(manager.is_member(Room::Agents, client).await);
        assert!(manager.is_member(room, client).await);
        assert_eq!(manager.total_client_count().await, 1);

        manager.leave(room, client).await;
        assert!(!manager.is_member(room, client).await);
        assert!(manager.is_member(Room::Agents, client).await);
    }

    #[tokio::test]
    async fn empty_rooms_are_dropped() {
        let manager = RoomManager::default();
        let client = ClientId::new();
        let room = conversation_room();
        let _rx = manager.join(room, client).await;

        manager.leave(room, client).await;
        assert!(manager.active_rooms().await.is_empty());
        assert_eq!(manager.total_client_count().await, 0);
    }

    #[tokio::test]
    async fn leave_all_clears_every_membership() {
        let manager = RoomManager::default();
        let client = ClientId::new();
        let other = ClientId::new();
        let room = conversation_room();
        let _a = manager.join(Room::Agents, client).await;
        let _b = manager.join(room, client).await;
        let _c = manager.join(Room::Agents, other).await;

        manager.leave_all(client).await;

        assert_eq!(manager.client_count(Room::Agents).await, 1);
        assert_eq!(manager.client_count(room).await, 0);
        assert_eq!(manager.active_rooms().await, vec![Room::Agents]);
    }

    #[tokio::test]
    async fn broadcast_to_missing_room_is_noop() {
        let manager = RoomManager::default();
        assert_eq!(manager.broadcast(conversation_room(), ServerMessage::pong()).await, 0);
    }

    #[test]
    fn room_names() {
        assert_eq!(Room::Agents.to_string(), "agents");
        let id = ConversationId::new();
        assert_eq!(Room::Conversation(id).to_string(), format!("conversation:{}", id));
    }
}
