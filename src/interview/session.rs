// src/interview/session.rs
use crate::channel::{Participant, ParticipantId};
use crate::models::transcript::{Role, Turn};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// In-memory state of one running interview.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub participant_id: ParticipantId,
    pub username: Option<String>,
    pub turns: Vec<Turn>,
    pub started_at: String,
    /// Prompt the participant is currently answering
    pub last_prompt: String,
    /// Position in the question list, fixed-list policy only
    pub question_index: Option<usize>,
}

impl Session {
    pub fn start(participant: &Participant) -> Self {
        Self {
            participant_id: participant.id,
            username: participant.username.clone(),
            turns: Vec::new(),
            started_at: now_timestamp(),
            last_prompt: String::new(),
            question_index: None,
        }
    }

    /// Append the pending prompt and the participant's answer to it. The prompt
    /// stays pending until a new one replaces it.
    pub fn record_answer(&mut self, answer: &str) {
        if !self.last_prompt.is_empty() {
            self.turns.push(Turn::assistant(self.last_prompt.clone()));
        }
        self.turns.push(Turn::user(answer));
    }

    pub fn user_turns(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| turn.role == Role::User)
            .count()
    }
}

/// Active interviews keyed by participant. A participant without an entry is inactive.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ParticipantId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, participant_id: ParticipantId) -> Option<Session> {
        self.sessions.read().await.get(&participant_id).cloned()
    }

    /// Insert or overwrite the participant's session.
    pub async fn put(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.participant_id, session);
    }

    pub async fn remove(&self, participant_id: ParticipantId) -> Option<Session> {
        self.sessions.write().await.remove(&participant_id)
    }

    pub async fn is_active(&self, participant_id: ParticipantId) -> bool {
        self.sessions.read().await.contains_key(&participant_id)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
