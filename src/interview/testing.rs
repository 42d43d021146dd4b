// src/interview/testing.rs
//! Test doubles for the interview state machine.

use crate::channel::{Channel, ChannelError, OutboundMessage};
use crate::completion_client::{CompletionClient, CompletionError, CompletionRequest};
use crate::models::transcript::{NewTranscript, TranscriptRecord};
use crate::store::{StoreError, TranscriptStore};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Returns scripted replies in order and records every request.
pub struct StubCompletion {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StubCompletion {
    pub fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Malformed("no scripted reply".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(i64, OutboundMessage)>>,
}

impl RecordingChannel {
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.text).collect()
    }

    pub fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, m)| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push((chat_id, message));
        Ok(())
    }
}

/// Store whose writes always fail.
pub struct FailingStore;

#[async_trait]
impl TranscriptStore for FailingStore {
    async fn insert(&self, _transcript: &NewTranscript) -> Result<i64, StoreError> {
        Err(StoreError::DatabaseError(sqlx::Error::PoolClosed))
    }

    async fn update_summary(&self, id: i64, _summary: &str) -> Result<(), StoreError> {
        Err(StoreError::MissingRecord(id))
    }

    async fn list_participants(&self) -> Result<Vec<i64>, StoreError> {
        Ok(Vec::new())
    }

    async fn latest_for(&self, _user_id: i64) -> Result<Option<TranscriptRecord>, StoreError> {
        Ok(None)
    }

    async fn all_for(&self, _user_id: i64) -> Result<Vec<TranscriptRecord>, StoreError> {
        Ok(Vec::new())
    }
}

/// Delivers like `RecordingChannel`, except that the listed texts fail.
#[derive(Default)]
pub struct RejectingChannel {
    rejected: Vec<String>,
    pub delivered: RecordingChannel,
}

impl RejectingChannel {
    pub fn rejecting(texts: &[&str]) -> Self {
        Self {
            rejected: texts.iter().map(|t| t.to_string()).collect(),
            delivered: RecordingChannel::default(),
        }
    }
}

#[async_trait]
impl Channel for RejectingChannel {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> Result<(), ChannelError> {
        if self.rejected.contains(&message.text) {
            return Err(ChannelError::Api("Forbidden: bot was blocked by the user".to_string()));
        }
        self.delivered.send(chat_id, message).await
    }
}
