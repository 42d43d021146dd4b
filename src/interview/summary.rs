// src/interview/summary.rs
use crate::completion_client::{ChatMessage, ChatRole, CompletionClient, CompletionError, CompletionRequest};
use crate::models::transcript::Turn;
use std::sync::Arc;

/// Turns the finished transcript into a report through one completion call.
#[derive(Clone)]
pub struct SummaryGenerator {
    client: Arc<dyn CompletionClient>,
    instruction: String,
    model: Option<String>,
    fallback: String,
}

impl SummaryGenerator {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        instruction: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            client,
            instruction: instruction.into(),
            model: None,
            fallback: fallback.into(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub async fn try_generate(&self, turns: &[Turn]) -> Result<String, CompletionError> {
        let request = CompletionRequest::new(
            self.instruction.clone(),
            vec![ChatMessage {
                role: ChatRole::User,
                content: render_transcript(turns),
            }],
        )
        .with_model(self.model.clone());

        self.client.complete(request).await
    }

    /// Like `try_generate`, but a failure yields the fixed fallback text.
    pub async fn generate(&self, turns: &[Turn]) -> String {
        match self.try_generate(turns).await {
            Ok(summary) => {
                tracing::info!("Final report generated");
                summary
            }
            Err(e) => {
                tracing::error!("Failed to generate final report: {}", e);
                self.fallback.clone()
            }
        }
    }
}

/// One `Role: content` line per turn.
pub fn render_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}
