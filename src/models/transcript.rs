// src/models/transcript.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Who said a turn of the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
}

impl Role {
    /// Capitalised form used when rendering a transcript for the summary prompt
    pub fn label(&self) -> &'static str {
        match self {
            Role::Assistant => "Assistant",
            Role::User => "User",
        }
    }
}

/// A single message of the interview, serialized as `{"role": .., "content": ..}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Row of the `interviews` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TranscriptRecord {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
    pub dialog: String,
    pub summary: Option<String>,
}

/// Everything needed to insert a finished interview.
#[derive(Debug, Clone)]
pub struct NewTranscript {
    pub user_id: i64,
    pub username: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub dialog: Vec<Turn>,
    pub summary: String,
}

impl NewTranscript {
    pub fn serialized_dialog(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.dialog)
    }
}

/// JSON shape returned by the dialogs API, with `dialog` parsed back into structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogView {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub dialog: Value,
    pub summary: Option<String>,
    pub start_time: String,
    pub end_time: Option<String>,
}

impl From<TranscriptRecord> for DialogView {
    fn from(record: TranscriptRecord) -> Self {
        // Older rows may hold plain text rather than a JSON turn list
        let dialog = serde_json::from_str(&record.dialog)
            .unwrap_or_else(|_| Value::String(record.dialog.clone()));

        Self {
            id: record.id,
            user_id: record.user_id,
            username: record.username,
            dialog,
            summary: record.summary,
            start_time: record.start_time,
            end_time: record.end_time,
        }
    }
}
