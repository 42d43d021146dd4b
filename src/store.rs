// src/store.rs
//! Append-only store of finished interview transcripts.

use crate::models::transcript::{NewTranscript, TranscriptRecord};
use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("No transcript with id {0}")]
    MissingRecord(i64),
}

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Insert a finished interview and return its surrogate id.
    async fn insert(&self, transcript: &NewTranscript) -> Result<i64, StoreError>;

    /// Replace the summary of the row created by a previous `insert`.
    async fn update_summary(&self, id: i64, summary: &str) -> Result<(), StoreError>;

    /// Distinct participant ids, in the order they first appeared.
    async fn list_participants(&self) -> Result<Vec<i64>, StoreError>;

    async fn latest_for(&self, user_id: i64) -> Result<Option<TranscriptRecord>, StoreError>;

    async fn all_for(&self, user_id: i64) -> Result<Vec<TranscriptRecord>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteTranscriptStore {
    db_pool: SqlitePool,
}

impl SqliteTranscriptStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db_pool
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn insert(&self, transcript: &NewTranscript) -> Result<i64, StoreError> {
        let dialog = transcript.serialized_dialog()?;

        let result = sqlx::query(
            "INSERT INTO interviews (user_id, username, start_time, end_time, dialog, summary)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(transcript.user_id)
        .bind(&transcript.username)
        .bind(&transcript.start_time)
        .bind(&transcript.end_time)
        .bind(dialog)
        .bind(&transcript.summary)
        .execute(&self.db_pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(
            participant_id = transcript.user_id,
            transcript_id = id,
            turns = transcript.dialog.len(),
            "Interview saved"
        );
        Ok(id)
    }

    async fn update_summary(&self, id: i64, summary: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE interviews SET summary = ? WHERE id = ?")
            .bind(summary)
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingRecord(id));
        }
        Ok(())
    }

    async fn list_participants(&self) -> Result<Vec<i64>, StoreError> {
        let rows = sqlx::query_as::<_, (i64,)>(
            "SELECT user_id FROM interviews GROUP BY user_id ORDER BY MIN(id)",
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    async fn latest_for(&self, user_id: i64) -> Result<Option<TranscriptRecord>, StoreError> {
        let record = sqlx::query_as::<_, TranscriptRecord>(
            "SELECT id, user_id, username, start_time, end_time, dialog, summary
             FROM interviews
             WHERE user_id = ?
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(record)
    }

    async fn all_for(&self, user_id: i64) -> Result<Vec<TranscriptRecord>, StoreError> {
        let records = sqlx::query_as::<_, TranscriptRecord>(
            "SELECT id, user_id, username, start_time, end_time, dialog, summary
             FROM interviews
             WHERE user_id = ?
             ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(records)
    }
}
