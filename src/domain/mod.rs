//! Domain layer: pure types and rules, no I/O.
//!
//! - `foundation` - ids, timestamps, errors, event plumbing
//! - `conversation` - the conversation aggregate and everything it owns
//! - `listing` - marketable listings used to ground replies

pub mod conversation;
pub mod foundation;
pub mod listing;
