// src/completion_client.rs
use crate::models::transcript::{Role, Turn};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            Role::Assistant => ChatRole::Assistant,
            Role::User => ChatRole::User,
        };
        Self {
            role,
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonObject,
}

/// One completion call: a system instruction plus the conversation so far.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub format: ResponseFormat,
    /// Overrides the client's default model for this call
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            ..Default::default()
        }
    }

    pub fn from_turns(system: impl Into<String>, turns: &[Turn]) -> Self {
        Self::new(system, turns.iter().map(ChatMessage::from).collect())
    }

    pub fn json_object(mut self) -> Self {
        self.format = ResponseFormat::JsonObject;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Remote chat-completion service. A single attempt per call; every failure is
/// reported as one `CompletionError`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// Parse a JSON reply, tolerating a markdown code fence around it.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, CompletionError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|e| CompletionError::Malformed(format!("{}. Response: {}", e, raw)))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatSpec>,
}

#[derive(Debug, Serialize)]
struct ResponseFormatSpec {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for OpenRouter or any other OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        let model = request.model.as_deref().unwrap_or(&self.model);

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage {
            role: ChatRole::System,
            content: request.system,
        });
        messages.extend(request.messages);

        let body = ChatCompletionRequest {
            model,
            messages,
            temperature: request.temperature.or(self.temperature),
            response_format: match request.format {
                ResponseFormat::Text => None,
                ResponseFormat::JsonObject => Some(ResponseFormatSpec {
                    format_type: "json_object",
                }),
            },
        };

        tracing::debug!(
            model = %model,
            messages = body.messages.len(),
            "Completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        tracing::debug!("Completion response (status {}): {}", status, response_text);

        if !status.is_success() {
            tracing::error!("Completion API error ({}): {}", status, response_text);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| CompletionError::Malformed(format!("{}. Response: {}", e, response_text)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CompletionError::Malformed("No content in completion response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Extension, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Captured {
        body: Mutex<Option<Value>>,
        auth: Mutex<Option<String>>,
    }

    async fn serve(status: StatusCode, reply: Value) -> (String, Arc<Captured>) {
        let captured = Arc::new(Captured::default());

        let handler = move |Extension(captured): Extension<Arc<Captured>>,
                            headers: axum::http::HeaderMap,
                            Json(body): Json<Value>| {
            let reply = reply.clone();
            async move {
                *captured.body.lock().unwrap() = Some(body);
                *captured.auth.lock().unwrap() = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                (status, Json(reply)).into_response()
            }
        };

        let app = Router::new()
            .route("/chat/completions", post(handler))
            .layer(Extension(captured.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), captured)
    }

    #[tokio::test]
    async fn test_complete_sends_system_first_and_returns_content() {
        let (url, captured) = serve(
            StatusCode::OK,
            json!({"choices": [{"message": {"role": "assistant", "content": "Next question?"}}]}),
        )
        .await;

        let client = OpenRouterClient::new("secret".to_string())
            .with_base_url(url)
            .with_model("test/model")
            .with_temperature(Some(0.7));

        let request = CompletionRequest::from_turns(
            "You are an interviewer",
            &[Turn::assistant("Why?"), Turn::user("Pay")],
        );
        let reply = client.complete(request).await.unwrap();
        assert_eq!(reply, "Next question?");

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "test/model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are an interviewer");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][2]["content"], "Pay");
        assert!(body.get("response_format").is_none());
        assert_eq!(captured.auth.lock().unwrap().as_deref(), Some("Bearer secret"));
    }

    #[tokio::test]
    async fn test_json_object_format_and_model_override() {
        let (url, captured) = serve(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": "{}"}}]}),
        )
        .await;

        let client = OpenRouterClient::new("k".to_string()).with_base_url(url);
        let request = CompletionRequest::new("sys", vec![])
            .json_object()
            .with_model(Some("summary/model".to_string()));
        client.complete(request).await.unwrap();

        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["model"], "summary/model");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let (url, _) = serve(StatusCode::TOO_MANY_REQUESTS, json!({"error": "rate limited"})).await;
        let client = OpenRouterClient::new("k".to_string()).with_base_url(url);

        let err = client.complete(CompletionRequest::new("sys", vec![])).await.unwrap_err();
        assert!(matches!(err, CompletionError::Api { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed() {
        let (url, _) = serve(StatusCode::OK, json!({"choices": []})).await;
        let client = OpenRouterClient::new("k".to_string()).with_base_url(url);

        let err = client.complete(CompletionRequest::new("sys", vec![])).await.unwrap_err();
        assert!(matches!(err, CompletionError::Malformed(_)));
    }

    #[test]
    fn test_parse_structured_strips_code_fence() {
        let value: Value = parse_structured("```json\n{\"answer\": \"ok\"}\n```").unwrap();
        assert_eq!(value["answer"], "ok");

        let value: Value = parse_structured("  {\"answer\": \"plain\"} ").unwrap();
        assert_eq!(value["answer"], "plain");

        assert!(parse_structured::<Value>("not json").is_err());
    }
}
