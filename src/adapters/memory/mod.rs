//! In-memory store adapters for tests and database-less runs.

mod conversation_repository;
mod listing_reader;
mod message_repository;

pub use conversation_repository::InMemoryConversationRepository;
pub use listing_reader::StaticListingReader;
pub use message_repository::InMemoryMessageRepository;
