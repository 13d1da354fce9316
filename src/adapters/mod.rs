//! Adapters - implementations of the ports plus the inbound surfaces.
//!
//! - `ai` - language-model providers (OpenAI, Anthropic, mock)
//! - `auth` - dashboard token validators
//! - `events` - in-process event bus
//! - `http` - agent REST API and channel entry points
//! - `memory` - in-memory stores for tests and demo runs
//! - `messaging` - phone-network messaging client
//! - `postgres` - sqlx-backed stores
//! - `websocket` - realtime rooms and socket handlers

pub mod ai;
pub mod auth;
pub mod events;
pub mod http;
pub mod memory;
pub mod messaging;
pub mod postgres;
pub mod websocket;

pub use events::InMemoryEventBus;
