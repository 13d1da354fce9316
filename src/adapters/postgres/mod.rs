//! PostgreSQL adapters.
//!
//! - `PostgresConversationRepository` - conversations with partial-unique open identities
//! - `PostgresMessageRepository` - append-only transcripts
//! - `PostgresListingReader` - marketable listings for grounding
//!
//! Schema lives in `migrations/`; run it with [`run_migrations`].

mod conversation_repository;
mod listing_reader;
mod message_repository;

pub use conversation_repository::PostgresConversationRepository;
pub use listing_reader::PostgresListingReader;
pub use message_repository::PostgresMessageRepository;

use sqlx::PgPool;

/// Applies pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
