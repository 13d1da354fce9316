//! WebSocket upgrade handlers for widgets and agent dashboards.
//!
//! Connection lifecycle:
//! 1. Check admission (session id for widgets, token for dashboards)
//! 2. Upgrade and send `connected`
//! 3. Dashboards join the agents room
//! 4. Process client commands until disconnect
//! 5. Leave every room
//!
//! Each connection has one outbound queue. A writer task drains it into the
//! socket and one forwarder task per joined room feeds it, so replies to
//! commands and room broadcasts share a single ordered stream. The queue is
//! bounded; a client that stops reading loses messages instead of growing it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::application::{ConversationOrchestrator, ConversationQueries};
use crate::domain::foundation::{AuthError, AuthenticatedAgent, ConversationId};
use crate::ports::AgentTokenValidator;

use super::messages::{
    now_rfc3339, ClientMessage, ClientRole, ConnectedMessage, MessageAckMessage, ServerMessage,
};
use super::rooms::{ClientId, Room, RoomManager};

const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
const FORBIDDEN: &str = "FORBIDDEN";

/// Messages buffered per connection before new ones are dropped.
const OUTBOX_CAPACITY: usize = 256;

/// Shared state for both socket endpoints.
#[derive(Clone)]
pub struct WebSocketState {
    pub room_manager: Arc<RoomManager>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub queries: Arc<ConversationQueries>,
    pub token_validator: Arc<dyn AgentTokenValidator>,
}

impl WebSocketState {
    pub fn new(
        room_manager: Arc<RoomManager>,
        orchestrator: Arc<ConversationOrchestrator>,
        queries: Arc<ConversationQueries>,
        token_validator: Arc<dyn AgentTokenValidator>,
    ) -> Self {
        Self {
            room_manager,
            orchestrator,
            queries,
            token_validator,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    token: Option<String>,
}

/// Who is on the other end of a socket.
#[derive(Debug, Clone)]
enum Peer {
    Widget { session_id: String },
    Agent(AuthenticatedAgent),
}

/// `GET /ws/chat?session_id=…`. Widgets identify by session only.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ChatParams>,
    State(state): State<WebSocketState>,
) -> Response {
    let session_id = match params.session_id.map(|s| s.trim().to_string()) {
        Some(s) if !s.is_empty() => s,
        _ => return (StatusCode::BAD_REQUEST, "session_id is required").into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, Peer::Widget { session_id }, state))
}

/// `GET /ws/dashboard?token=…`. The token may also come as a bearer
/// header. Refused before the upgrade if it doesn't verify.
pub async fn dashboard_ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<DashboardParams>,
    headers: HeaderMap,
    State(state): State<WebSocketState>,
) -> Response {
    let token = params.token.or_else(|| bearer_token(&headers));
    match authenticate(state.token_validator.as_ref(), token.as_deref()).await {
        Ok(agent) => ws.on_upgrade(move |socket| handle_socket(socket, Peer::Agent(agent), state)),
        Err(e) => {
            tracing::info!(error = %e, "dashboard socket refused");
            (StatusCode::UNAUTHORIZED, e.to_string()).into_response()
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

async fn authenticate(
    validator: &dyn AgentTokenValidator,
    token: Option<&str>,
) -> Result<AuthenticatedAgent, AuthError> {
    match token.map(str::trim) {
        Some(token) if !token.is_empty() => validator.validate(token).await,
        _ => Err(AuthError::MissingCredentials),
    }
}

async fn handle_socket(socket: WebSocket, peer: Peer, state: WebSocketState) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);
    let client_id = ClientId::new();

    let writer = tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(%client_id, error = %e, "dropping unserializable message");
                    continue;
                }
            };
            if sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut connection = Connection::new(client_id, peer, state, outbox);
    connection.open().await;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => connection.handle_text(&text).await,
            Ok(Message::Binary(_)) => {
                connection.send(ServerMessage::error(INVALID_MESSAGE, "Binary frames are not supported"));
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "socket receive error");
                break;
            }
        }
    }

    connection.close().await;
    writer.abort();
}

/// Per-socket state: identity, room forwarders, and the outbound queue.
struct Connection {
    client_id: ClientId,
    peer: Peer,
    state: WebSocketState,
    outbox: mpsc::Sender<ServerMessage>,
    forwarders: HashMap<Room, JoinHandle<()>>,
}

impl Connection {
    fn new(
        client_id: ClientId,
        peer: Peer,
        state: WebSocketState,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            client_id,
            peer,
            state,
            outbox,
            forwarders: HashMap::new(),
        }
    }

    async fn open(&mut self) {
        let connected = match &self.peer {
            Peer::Widget { session_id } => ConnectedMessage {
                client_id: self.client_id.to_string(),
                role: ClientRole::Widget,
                session_id: Some(session_id.clone()),
                agent_id: None,
                timestamp: now_rfc3339(),
            },
            Peer::Agent(agent) => ConnectedMessage {
                client_id: self.client_id.to_string(),
                role: ClientRole::Agent,
                session_id: None,
                agent_id: Some(agent.id.to_string()),
                timestamp: now_rfc3339(),
            },
        };
        self.send(ServerMessage::Connected(connected));

        if matches!(self.peer, Peer::Agent(_)) {
            self.join(Room::Agents).await;
        }
        tracing::debug!(client_id = %self.client_id, peer = ?self.peer, "socket connected");
    }

    fn send(&self, message: ServerMessage) {
        // A closed outbox means the writer is gone; the read loop ends soon.
        enqueue(&self.outbox, message, self.client_id);
    }

    async fn handle_text(&mut self, text: &str) {
        let command = match serde_json::from_str::<ClientMessage>(text) {
            Ok(command) => command,
            Err(e) => {
                self.send(ServerMessage::error(INVALID_MESSAGE, format!("Unrecognized command: {}", e)));
                return;
            }
        };

        match command {
            ClientMessage::Ping => self.send(ServerMessage::pong()),
            ClientMessage::JoinConversation { conversation_id } => {
                self.join_conversation(&conversation_id).await
            }
            ClientMessage::LeaveConversation { conversation_id } => {
                if let Ok(id) = conversation_id.parse::<ConversationId>() {
                    self.leave(Room::Conversation(id)).await;
                }
            }
            ClientMessage::Message { text } => self.chat(&text).await,
        }
    }

    async fn join_conversation(&mut self, raw_id: &str) {
        let Ok(id) = raw_id.parse::<ConversationId>() else {
            self.send(ServerMessage::error(INVALID_MESSAGE, "Invalid conversation id"));
            return;
        };

        let conversation = match self.state.queries.find(id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                self.send(ServerMessage::from_domain_error(&e));
                return;
            }
        };

        if let Peer::Widget { session_id } = &self.peer {
            if conversation.identity().web_session_id() != Some(session_id.as_str()) {
                self.send(ServerMessage::error(FORBIDDEN, "Conversation belongs to another session"));
                return;
            }
        }

        self.join(Room::Conversation(id)).await;
    }

    async fn chat(&mut self, text: &str) {
        let Peer::Widget { session_id } = &self.peer else {
            self.send(ServerMessage::error(
                INVALID_MESSAGE,
                "Agents send messages through the dashboard API",
            ));
            return;
        };
        let session_id = session_id.clone();

        match self
            .state
            .orchestrator
            .handle_web_chat_message(&session_id, text)
            .await
        {
            Ok(reply) => {
                self.send(ServerMessage::MessageAck(MessageAckMessage {
                    conversation_id: reply.conversation_id.to_string(),
                    response: reply.response,
                    timestamp: now_rfc3339(),
                }));
                // Later replies, including agent messages, arrive as room events.
                self.join(Room::Conversation(reply.conversation_id)).await;
            }
            Err(e) => {
                tracing::warn!(client_id = %self.client_id, error = %e, "web chat message failed");
                self.send(ServerMessage::from_domain_error(&e));
            }
        }
    }

    async fn join(&mut self, room: Room) {
        if self.forwarders.contains_key(&room) {
            return;
        }
        let receiver = self.state.room_manager.join(room, self.client_id).await;
        let forwarder = tokio::spawn(forward(receiver, self.outbox.clone(), self.client_id, room));
        self.forwarders.insert(room, forwarder);
    }

    async fn leave(&mut self, room: Room) {
        if let Some(forwarder) = self.forwarders.remove(&room) {
            forwarder.abort();
            self.state.room_manager.leave(room, self.client_id).await;
        }
    }

    async fn close(mut self) {
        for (_, forwarder) in self.forwarders.drain() {
            forwarder.abort();
        }
        self.state.room_manager.leave_all(self.client_id).await;
        tracing::debug!(client_id = %self.client_id, "socket disconnected");
    }
}

/// Pipes one room's broadcasts into a connection's queue.
async fn forward(
    mut receiver: broadcast::Receiver<ServerMessage>,
    outbox: mpsc::Sender<ServerMessage>,
    client_id: ClientId,
    room: Room,
) {
    loop {
        match receiver.recv().await {
            Ok(message) => {
                if !enqueue(&outbox, message, client_id) {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(%client_id, %room, skipped, "slow client dropped room events");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Queues without waiting. Returns false once the writer has gone away.
fn enqueue(outbox: &mpsc::Sender<ServerMessage>, message: ServerMessage, client_id: ClientId) -> bool {
    match outbox.try_send(message) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(%client_id, capacity = OUTBOX_CAPACITY, "outbox full, dropping message");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Socket routes. Mount at the root; paths are absolute.
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new()
        .route("/ws/chat", get(chat_ws_handler))
        .route("/ws/dashboard", get(dashboard_ws_handler))
}
