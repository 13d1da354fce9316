//! Prospect Concierge - AI-assisted prospect conversations with agent handoff
//!
//! Prospects reach a property business over a phone messaging channel or
//! an embedded web chat widget. An assistant grounded in the live listing
//! catalogue answers them until a human agent takes the conversation over
//! from the dashboard, and a background pass keeps a structured lead
//! profile up to date as the conversation goes.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
