//! PostgreSQL implementation of ConversationStore.
//!
//! `conversations` holds one row per lead with the embedded state as JSONB;
//! `conversation_messages` holds the history in insertion order. A patch runs
//! in one transaction: message inserts plus `jsonb_set` on the changed
//! sub-fields. An overwrite replaces the row and the whole history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::conversation::{ChangeSet, Conversation, SenderRole};
use crate::domain::foundation::{LeadId, Timestamp};
use crate::ports::{ConversationStore, PatchOutcome, StoreError};

use super::record::{ControlRecord, ConversationRecord, FieldRecord, MessageRecord, StateRecord};

/// Migrations shipped with the crate.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool from configuration and optionally runs migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(config.idle_timeout())
            .max_lifetime(config.max_lifetime())
            .connect(&config.url)
            .await
            .map_err(|e| db("Failed to connect", e))?;

        if config.run_migrations {
            MIGRATOR
                .run(&pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to run migrations: {}", e)))?;
            tracing::info!("database migrations applied");
        }

        Ok(Self::new(pool))
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| db("Failed to start transaction", e))
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn load(&self, id: &LeadId) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT lead_id, channel, created_at, updated_at, state
            FROM conversations
            WHERE lead_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db("Failed to fetch conversation", e))?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let message_rows = sqlx::query(
            r#"
            SELECT id, sender, text, sent_at, delivered, read, external_id
            FROM conversation_messages
            WHERE lead_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db("Failed to fetch messages", e))?;

        let messages = message_rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let Json(state): Json<StateRecord> = get(&row, "state")?;
        let record = ConversationRecord {
            lead_id: get(&row, "lead_id")?,
            channel: get(&row, "channel")?,
            created_at: get(&row, "created_at")?,
            updated_at: get(&row, "updated_at")?,
            state,
            messages,
        };

        Conversation::try_from(record).map(Some)
    }

    async fn create(&self, id: &LeadId, at: Timestamp) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new(id.clone(), at);
        let record = ConversationRecord::from(&conversation);

        let result = sqlx::query(
            r#"
            INSERT INTO conversations (lead_id, channel, created_at, updated_at, state)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (lead_id) DO NOTHING
            "#,
        )
        .bind(&record.lead_id)
        .bind(&record.channel)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(Json(&record.state))
        .execute(&self.pool)
        .await
        .map_err(|e| db("Failed to insert conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(id.clone()));
        }
        Ok(conversation)
    }

    async fn patch(&self, id: &LeadId, changes: &ChangeSet) -> Result<PatchOutcome, StoreError> {
        let mut tx = self.begin().await?;

        let touched = sqlx::query(
            "UPDATE conversations SET updated_at = GREATEST(updated_at, $2) WHERE lead_id = $1",
        )
        .bind(id.as_str())
        .bind(changes.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db("Failed to update conversation", e))?;

        // Dropping the transaction rolls it back.
        if touched.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }

        for message in &changes.appended_messages {
            insert_message(&mut tx, id, &MessageRecord::from(message)).await?;
        }

        for (name, value) in &changes.changed_fields {
            let field = FieldRecord {
                value: Some(value.clone()),
                filled: true,
            };
            sqlx::query(
                "UPDATE conversations SET state = jsonb_set(state, ARRAY['fields', $2], $3) WHERE lead_id = $1",
            )
            .bind(id.as_str())
            .bind(name.as_str())
            .bind(Json(&field))
            .execute(&mut *tx)
            .await
            .map_err(|e| db("Failed to update field", e))?;
        }

        if let Some(control) = &changes.control {
            sqlx::query(
                "UPDATE conversations SET state = jsonb_set(state, '{control}', $2) WHERE lead_id = $1",
            )
            .bind(id.as_str())
            .bind(Json(ControlRecord::from(control)))
            .execute(&mut *tx)
            .await
            .map_err(|e| db("Failed to update control state", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db("Failed to commit transaction", e))?;

        Ok(PatchOutcome::Applied)
    }

    async fn overwrite(&self, id: &LeadId, snapshot: &Conversation) -> Result<(), StoreError> {
        let record = ConversationRecord::from(snapshot);
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO conversations (lead_id, channel, created_at, updated_at, state)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (lead_id) DO UPDATE SET
                channel = EXCLUDED.channel,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at,
                state = EXCLUDED.state
            "#,
        )
        .bind(id.as_str())
        .bind(&record.channel)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(Json(&record.state))
        .execute(&mut *tx)
        .await
        .map_err(|e| db("Failed to upsert conversation", e))?;

        sqlx::query("DELETE FROM conversation_messages WHERE lead_id = $1")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db("Failed to delete messages", e))?;

        for message in &record.messages {
            insert_message(&mut tx, id, message).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db("Failed to commit transaction", e))?;

        Ok(())
    }
}

async fn insert_message(
    tx: &mut Transaction<'_, Postgres>,
    id: &LeadId,
    message: &MessageRecord,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO conversation_messages
            (lead_id, id, sender, text, sent_at, delivered, read, external_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id.as_str())
    .bind(message.id)
    .bind(sender_to_str(message.sender))
    .bind(&message.text)
    .bind(message.timestamp)
    .bind(message.delivered)
    .bind(message.read)
    .bind(&message.external_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| db("Failed to insert message", e))?;
    Ok(())
}

fn message_from_row(row: &PgRow) -> Result<MessageRecord, StoreError> {
    let sender: String = get(row, "sender")?;
    Ok(MessageRecord {
        id: get::<Uuid>(row, "id")?,
        sender: str_to_sender(&sender)?,
        text: get(row, "text")?,
        timestamp: get::<DateTime<Utc>>(row, "sent_at")?,
        delivered: get(row, "delivered")?,
        read: get(row, "read")?,
        external_id: get(row, "external_id")?,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt(format!("column {}: {}", column, e)))
}

fn db(context: &str, err: sqlx::Error) -> StoreError {
    StoreError::Database(format!("{}: {}", context, err))
}

fn sender_to_str(sender: SenderRole) -> &'static str {
    match sender {
        SenderRole::Lead => "lead",
        SenderRole::Bot => "bot",
        SenderRole::Agent => "agent",
    }
}

fn str_to_sender(s: &str) -> Result<SenderRole, StoreError> {
    match s {
        "lead" => Ok(SenderRole::Lead),
        "bot" => Ok(SenderRole::Bot),
        "agent" => Ok(SenderRole::Agent),
        _ => Err(StoreError::Corrupt(format!("Unknown sender role: {}", s))),
    }
}
