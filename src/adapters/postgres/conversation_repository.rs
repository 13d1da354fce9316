//! PostgreSQL implementation of ConversationRepository.
//!
//! Open-conversation uniqueness is enforced by partial unique indexes on
//! the identity columns (`WHERE status <> 'closed'`). Creation inserts with
//! `ON CONFLICT DO NOTHING` and falls back to reading the winner's row.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::conversation::{
    Channel, Conversation, ConversationStatus, Intent, LeadProfile, Preferences,
    ProspectIdentity, Schedule,
};
use crate::domain::foundation::{
    AgentId, ConversationId, DomainError, ErrorCode, ListingId, Timestamp,
};
use crate::ports::{ConversationFilter, ConversationRepository};

const CONVERSATION_COLUMNS: &str = "id, channel, phone_number, web_session_id, status, \
    assigned_agent_id, prospect_name, intent, preferences, interested_property_ids, schedule, \
    summary, last_message_at, created_at, updated_at";

/// Attempts before giving up when the open row vanishes between insert and
/// re-read (it was closed concurrently).
const CREATE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_if_absent(
        &self,
        conversation: &Conversation,
    ) -> Result<Option<Conversation>, DomainError> {
        let identity = conversation.identity();
        let query = format!(
            r#"
            INSERT INTO conversations (
                id, channel, phone_number, web_session_id, status,
                last_message_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(conversation.id().as_uuid())
            .bind(conversation.channel().as_str())
            .bind(identity.phone_number())
            .bind(identity.web_session_id())
            .bind(conversation.status().as_str())
            .bind(conversation.last_message_at().as_datetime())
            .bind(conversation.created_at().as_datetime())
            .bind(conversation.updated_at().as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("insert conversation", e))?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn find_open(
        &self,
        identity: &ProspectIdentity,
    ) -> Result<Option<Conversation>, DomainError> {
        let key_column = match identity.channel() {
            Channel::Phone => "phone_number",
            Channel::Web => "web_session_id",
        };
        let query = format!(
            "SELECT {} FROM conversations WHERE channel = $1 AND {} = $2 AND status <> 'closed'",
            CONVERSATION_COLUMNS, key_column
        );

        let row = sqlx::query(&query)
            .bind(identity.channel().as_str())
            .bind(identity.key())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch open conversation", e))?;

        row.as_ref().map(conversation_from_row).transpose()
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    async fn find_or_create_open(
        &self,
        identity: &ProspectIdentity,
    ) -> Result<(Conversation, bool), DomainError> {
        for _ in 0..CREATE_ATTEMPTS {
            if let Some(existing) = self.find_open(identity).await? {
                return Ok((existing, false));
            }

            let fresh = Conversation::open(identity.clone());
            if let Some(created) = self.insert_if_absent(&fresh).await? {
                return Ok((created, true));
            }
            // Lost the race; the next pass reads the winner.
        }

        Err(DomainError::database(
            "could not resolve an open conversation for identity",
        ))
    }

    async fn find_by_id(&self, id: ConversationId) -> Result<Option<Conversation>, DomainError> {
        let query = format!("SELECT {} FROM conversations WHERE id = $1", CONVERSATION_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("fetch conversation", e))?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn update_status(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET
                status = $2,
                assigned_agent_id = $3,
                updated_at = $4
            WHERE id = $1 AND status <> 'closed'
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(conversation.status().as_str())
        .bind(conversation.assigned_agent_id().map(AgentId::as_str))
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update conversation status", e))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        // Nothing updated: either the id is unknown or the row was closed
        // after the caller loaded it.
        match self.find_by_id(conversation.id()).await? {
            Some(stored) => stored.ensure_open(),
            None => ensure_found(0, conversation.id()),
        }
    }

    async fn update_lead(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let lead = conversation.lead();
        let result = sqlx::query(
            r#"
            UPDATE conversations SET
                prospect_name = $2,
                intent = $3,
                preferences = $4,
                interested_property_ids = $5,
                schedule = $6,
                summary = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(lead.prospect_name.as_deref())
        .bind(lead.intent.map(|i| i.as_str()))
        .bind(Json(&lead.preferences))
        .bind(lead.interested_property_ids.as_ref().map(Json))
        .bind(Json(&lead.schedule))
        .bind(lead.summary.as_deref())
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update conversation lead", e))?;

        ensure_found(result.rows_affected(), conversation.id())
    }

    async fn touch(&self, id: ConversationId, at: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET
                last_message_at = GREATEST(last_message_at, $2),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("touch conversation", e))?;

        ensure_found(result.rows_affected(), id)
    }

    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<Conversation>, DomainError> {
        let query = format!(
            r#"
            SELECT {}
            FROM conversations
            WHERE (($1::text IS NULL AND status <> 'closed') OR status = $1)
              AND ($2::text IS NULL OR channel = $2)
              AND ($3::text IS NULL OR assigned_agent_id = $3)
            ORDER BY last_message_at DESC, created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            CONVERSATION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.channel.map(|c| c.as_str()))
            .bind(filter.assigned_agent_id.as_ref().map(AgentId::as_str))
            .bind(i64::from(filter.effective_limit()))
            .bind(i64::from(filter.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list conversations", e))?;

        rows.iter().map(conversation_from_row).collect()
    }
}

fn db_error(action: &str, err: sqlx::Error) -> DomainError {
    tracing::error!(error = %err, "failed to {}", action);
    DomainError::database(format!("Failed to {}: {}", action, err))
}

fn ensure_found(rows_affected: u64, id: ConversationId) -> Result<(), DomainError> {
    if rows_affected == 0 {
        return Err(
            DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
                .with_detail("conversation_id", id.to_string()),
        );
    }
    Ok(())
}

fn conversation_from_row(row: &PgRow) -> Result<Conversation, DomainError> {
    let decode = |e: sqlx::Error| DomainError::database(format!("Bad conversation row: {}", e));

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let channel: String = row.try_get("channel").map_err(decode)?;
    let channel: Channel = channel.parse()?;
    let key: Option<String> = match channel {
        Channel::Phone => row.try_get("phone_number").map_err(decode)?,
        Channel::Web => row.try_get("web_session_id").map_err(decode)?,
    };
    let identity = ProspectIdentity::for_channel(channel, key.unwrap_or_default())?;

    let status: String = row.try_get("status").map_err(decode)?;
    let status: ConversationStatus = status.parse()?;

    let assigned_agent_id: Option<String> = row.try_get("assigned_agent_id").map_err(decode)?;
    let assigned_agent_id = assigned_agent_id.and_then(|a| AgentId::new(a).ok());

    let intent: Option<String> = row.try_get("intent").map_err(decode)?;
    let preferences: Json<Preferences> = row.try_get("preferences").map_err(decode)?;
    let interested: Option<Json<Vec<ListingId>>> =
        row.try_get("interested_property_ids").map_err(decode)?;
    let schedule: Json<Schedule> = row.try_get("schedule").map_err(decode)?;

    let lead = LeadProfile {
        prospect_name: row.try_get("prospect_name").map_err(decode)?,
        intent: intent.as_deref().map(Intent::parse),
        preferences: preferences.0,
        interested_property_ids: interested.map(|j| j.0),
        schedule: schedule.0,
        summary: row.try_get("summary").map_err(decode)?,
    };

    Ok(Conversation::reconstitute(
        ConversationId::from_uuid(id),
        identity,
        status,
        lead,
        assigned_agent_id,
        Timestamp::from_datetime(row.try_get("last_message_at").map_err(decode)?),
        Timestamp::from_datetime(row.try_get("created_at").map_err(decode)?),
        Timestamp::from_datetime(row.try_get("updated_at").map_err(decode)?),
    ))
}
