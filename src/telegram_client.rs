// src/telegram_client.rs
use crate::channel::{Channel, ChannelError, Keyboard, OutboundMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Keyboard {
        keyboard: Vec<Vec<KeyboardButton>>,
        resize_keyboard: bool,
        one_time_keyboard: bool,
    },
    Remove {
        remove_keyboard: bool,
    },
}

impl From<&Keyboard> for ReplyMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        match keyboard {
            Keyboard::Choices(labels) => ReplyMarkup::Keyboard {
                keyboard: vec![labels
                    .iter()
                    .map(|label| KeyboardButton { text: label.clone() })
                    .collect()],
                resize_keyboard: true,
                one_time_keyboard: true,
            },
            Keyboard::Remove => ReplyMarkup::Remove {
                remove_keyboard: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: Vec<&'static str>,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, "https://api.telegram.org")
    }

    pub fn with_base_url(token: String, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, ChannelError> {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response_text = request.send().await?.text().await?;

        let parsed: TelegramResponse<T> = serde_json::from_str(&response_text)
            .map_err(|e| ChannelError::Malformed(format!("{}. Response: {}", e, response_text)))?;

        if !parsed.ok {
            return Err(ChannelError::Api(
                parsed
                    .description
                    .unwrap_or_else(|| format!("{} failed", method)),
            ));
        }

        parsed
            .result
            .ok_or_else(|| ChannelError::Malformed(format!("{} returned no result", method)))
    }

    /// Long-poll for new updates; `offset` acknowledges everything before it.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ChannelError> {
        let body = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message"],
        };
        self.call(
            "getUpdates",
            &body,
            Some(Duration::from_secs(timeout_secs + 10)),
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<ReplyMarkup>,
    ) -> Result<(), ChannelError> {
        let body = SendMessageRequest {
            chat_id,
            text,
            reply_markup,
        };
        let _: serde_json::Value = self.call("sendMessage", &body, None).await?;
        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramClient {
    async fn send(&self, chat_id: i64, message: OutboundMessage) -> Result<(), ChannelError> {
        let markup = message.keyboard.as_ref().map(ReplyMarkup::from);
        self.send_message(chat_id, &message.text, markup).await
    }
}
