//! SQLite message repository.
//!
//! Appends run in one writer transaction: the next position is computed,
//! the row inserted and the session's `total_messages` refreshed together.

use chrono::Utc;
use parley_core::repository::message::{MessageFilter, MessageRepository};
use parley_types::error::RepositoryError;
use parley_types::message::{Message, MessageRole, MessageType, NewMessage};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    message_type: String,
    audio_url: String,
    audio_duration_seconds: Option<f64>,
    tokens_used: i64,
    position: i64,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            message_type: row.try_get("message_type")?,
            audio_url: row.try_get("audio_url")?,
            audio_duration_seconds: row.try_get("audio_duration_seconds")?,
            tokens_used: row.try_get("tokens_used")?,
            position: row.try_get("position")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let message_type: MessageType = self
            .message_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Message {
            id: parse_uuid(&self.id)?,
            session_id: parse_uuid(&self.session_id)?,
            role,
            content: self.content,
            message_type,
            audio_url: self.audio_url,
            audio_duration_seconds: self.audio_duration_seconds,
            tokens_used: self.tokens_used,
            order: self.position,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn collect(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Message>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        messages.push(MessageRow::from_row(row).map_err(query_error)?.into_message()?);
    }
    Ok(messages)
}

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &NewMessage) -> Result<Message, RepositoryError> {
        let session_id = message.session_id.to_string();
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let (position,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM messages WHERE session_id = ?",
        )
        .bind(&session_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(query_error)?;

        let stored = Message {
            id: Uuid::now_v7(),
            session_id: message.session_id,
            role: message.role,
            content: message.content.clone(),
            message_type: message.message_type,
            audio_url: message.audio_url.clone(),
            audio_duration_seconds: message.audio_duration_seconds,
            tokens_used: message.tokens_used,
            order: position,
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO messages (id, session_id, role, content, message_type, audio_url, audio_duration_seconds, tokens_used, position, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.to_string())
        .bind(&session_id)
        .bind(stored.role.to_string())
        .bind(&stored.content)
        .bind(stored.message_type.to_string())
        .bind(&stored.audio_url)
        .bind(stored.audio_duration_seconds)
        .bind(stored.tokens_used)
        .bind(stored.order)
        .bind(format_datetime(&stored.created_at))
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            // A missing session surfaces as a foreign key failure.
            return Err(match e {
                sqlx::Error::Database(ref db) if db.message().contains("FOREIGN KEY") => {
                    RepositoryError::NotFound
                }
                other => query_error(other),
            });
        }

        sqlx::query(
            "UPDATE sessions SET total_messages = (SELECT COUNT(*) FROM messages WHERE session_id = ?) WHERE id = ?",
        )
        .bind(&session_id)
        .bind(&session_id)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        Ok(stored)
    }

    async fn list_for_session(&self, session_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ? ORDER BY position ASC, created_at ASC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;
        collect(&rows)
    }

    async fn list_for_user_session(
        &self,
        session_id: &Uuid,
        user_id: &Uuid,
        filter: &MessageFilter,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT m.* FROM messages m JOIN sessions s ON s.id = m.session_id WHERE m.session_id = ",
        );
        qb.push_bind(session_id.to_string())
            .push(" AND s.user_id = ")
            .push_bind(user_id.to_string());
        if let Some(role) = filter.role {
            qb.push(" AND m.role = ").push_bind(role.to_string());
        }
        if let Some(message_type) = filter.message_type {
            qb.push(" AND m.message_type = ")
                .push_bind(message_type.to_string());
        }
        qb.push(" ORDER BY m.position ASC, m.created_at ASC");

        let rows = qb
            .build()
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;
        collect(&rows)
    }
}
