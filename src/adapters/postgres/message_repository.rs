//! PostgreSQL implementation of MessageRepository.
//!
//! `seq` is a bigserial assigned at insert, used to break ties between
//! messages stamped in the same instant.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::conversation::{Direction, Message, SenderType};
use crate::domain::foundation::{ConversationId, DomainError, MessageId, Timestamp};
use crate::ports::MessageRepository;

#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, conversation_id, direction, sender_type, content, metadata, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.conversation_id.as_uuid())
        .bind(message.direction.as_str())
        .bind(message.sender_type.as_str())
        .bind(&message.content)
        .bind(message.metadata.as_ref().map(Json))
        .bind(message.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert message", e))?;

        Ok(())
    }

    async fn recent(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT id, conversation_id, direction, sender_type, content, metadata,
                       created_at, seq
                FROM messages
                WHERE conversation_id = $1
                ORDER BY created_at DESC, seq DESC
                LIMIT $2
            ) latest
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(conversation_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch recent messages", e))?;

        rows.iter().map(message_from_row).collect()
    }

    async fn transcript(&self, conversation_id: ConversationId) -> Result<Vec<Message>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, direction, sender_type, content, metadata, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(conversation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch transcript", e))?;

        rows.iter().map(message_from_row).collect()
    }

    async fn count(&self, conversation_id: ConversationId) -> Result<u64, DomainError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count messages", e))?;

        Ok(count.max(0) as u64)
    }
}

fn db_error(action: &str, err: sqlx::Error) -> DomainError {
    tracing::error!(error = %err, "failed to {}", action);
    DomainError::database(format!("Failed to {}: {}", action, err))
}

fn message_from_row(row: &PgRow) -> Result<Message, DomainError> {
    let decode = |e: sqlx::Error| DomainError::database(format!("Bad message row: {}", e));

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let conversation_id: Uuid = row.try_get("conversation_id").map_err(decode)?;
    let direction: String = row.try_get("direction").map_err(decode)?;
    let sender_type: String = row.try_get("sender_type").map_err(decode)?;
    let metadata: Option<Json<serde_json::Value>> = row.try_get("metadata").map_err(decode)?;

    Ok(Message {
        id: MessageId::from_uuid(id),
        conversation_id: ConversationId::from_uuid(conversation_id),
        direction: direction.parse::<Direction>()?,
        sender_type: sender_type.parse::<SenderType>()?,
        content: row.try_get("content").map_err(decode)?,
        metadata: metadata.map(|j| j.0),
        created_at: Timestamp::from_datetime(row.try_get("created_at").map_err(decode)?),
    })
}
