//! Realtime push over WebSockets.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     InMemoryEventBus                         │
//! └──────────────────────────────────────────────────────────────┘
//!                              │ subscribes
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  WebSocketEventBridge                        │
//! │  conversation events → agents room + conversation room       │
//! │  web outbound messages → widget `reply`                      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │ broadcasts
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       RoomManager                            │
//! │  Room: agents          Room: conversation:<id>               │
//! │  ├── dashboard-a       ├── dashboard-a                       │
//! │  └── dashboard-b       └── widget-x                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery is at-most-once with no replay. A reconnecting client reloads
//! state through the REST API before relying on live events.

pub mod event_bridge;
pub mod handler;
pub mod messages;
pub mod rooms;

pub use event_bridge::WebSocketEventBridge;
pub use handler::{chat_ws_handler, dashboard_ws_handler, websocket_router, WebSocketState};
pub use messages::{
    ClientMessage, ClientRole, ConnectedMessage, ConversationEventMessage, ErrorMessage,
    MessageAckMessage, PongMessage, ReplyMessage, ServerMessage,
};
pub use rooms::{ClientId, Room, RoomManager};
