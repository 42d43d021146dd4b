// src/channel.rs
//! Messaging-channel seam between the interview state machine and the outside world.

use async_trait::async_trait;
use thiserror::Error;

/// Stable id of the person being interviewed (the Telegram user id)
pub type ParticipantId = i64;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Channel API error: {0}")]
    Api(String),
    #[error("Failed to parse channel response: {0}")]
    Malformed(String),
}

/// Who sent an inbound event and where replies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub chat_id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start`: show the greeting and the begin/cancel choice
    Greet,
    Begin,
    Cancel,
    /// `/end`: finish the running interview early
    End,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    /// One row of reply buttons, hidden after the first press
    Choices(Vec<String>),
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

#[async_trait]
pub trait Channel: Send + Sync {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> Result<(), ChannelError>;
}
