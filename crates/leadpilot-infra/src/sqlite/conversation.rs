//! SQLite conversation log implementation.
//!
//! Implements `ConversationLog` from `leadpilot-core`. One row in
//! `conversations` per visitor; `messages` is append-only and read back in
//! insertion (rowid) order.

use chrono::Utc;
use leadpilot_core::repository::conversation::ConversationLog;
use leadpilot_types::chat::{Conversation, MessageRole, StoredMessage};
use leadpilot_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `ConversationLog`.
#[derive(Clone)]
pub struct SqliteConversationLog {
    pool: DatabasePool,
}

impl SqliteConversationLog {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn select_conversation(
        &self,
        executor: &sqlx::SqlitePool,
        visitor_id: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE visitor_id = ?")
            .bind(visitor_id)
            .fetch_optional(executor)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            ConversationRow::from_row(&row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_conversation()
        })
        .transpose()
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: String,
    visitor_id: String,
    lead_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            visitor_id: row.try_get("visitor_id")?,
            lead_id: row.try_get("lead_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        Ok(Conversation {
            id: parse_uuid(&self.id, "conversation id")?,
            visitor_id: self.visitor_id,
            lead_id: self
                .lead_id
                .as_deref()
                .map(|id| parse_uuid(id, "lead_id"))
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<StoredMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(StoredMessage {
            id: parse_uuid(&self.id, "message id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// ConversationLog implementation
// ---------------------------------------------------------------------------

impl ConversationLog for SqliteConversationLog {
    async fn ensure_conversation(&self, visitor_id: &str) -> Result<Conversation, RepositoryError> {
        let now = format_datetime(&Utc::now());

        // A concurrent creator wins the UNIQUE(visitor_id) race; both callers
        // then read the same row back.
        sqlx::query(
            r#"INSERT INTO conversations (id, visitor_id, lead_id, created_at, updated_at)
               VALUES (?, ?, NULL, ?, ?)
               ON CONFLICT(visitor_id) DO NOTHING"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(visitor_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        self.select_conversation(&self.pool.writer, visitor_id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_conversation(
        &self,
        visitor_id: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        self.select_conversation(&self.pool.reader, visitor_id).await
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        let message = StoredMessage {
            id: Uuid::now_v7(),
            conversation_id: *conversation_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let created_at = format_datetime(&message.created_at);

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO messages (id, conversation_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(conversation_id.to_string())
        .bind(role.to_string())
        .bind(content)
        .bind(&created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => RepositoryError::NotFound,
            other => RepositoryError::Query(other.to_string()),
        })?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&created_at)
            .bind(conversation_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &Uuid) -> Result<Vec<StoredMessage>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE conversation_id = ? ORDER BY rowid ASC")
            .bind(conversation_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(message_row.into_message()?);
        }
        Ok(messages)
    }

    async fn link_lead(&self, conversation_id: &Uuid, lead_id: &Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE conversations SET lead_id = ?, updated_at = ? WHERE id = ? AND lead_id IS NULL",
        )
        .bind(lead_id.to_string())
        .bind(format_datetime(&Utc::now()))
        .bind(conversation_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM conversations WHERE id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        match exists {
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }
}
