// src/interview/machine.rs
use super::policy::{Policy, Question, Step, DEFAULT_MARKER};
use super::session::{now_timestamp, Session, SessionStore};
use super::summary::SummaryGenerator;
use super::{CancelBehavior, InterviewSettings, SummaryMode};
use crate::channel::{Channel, ChannelError, InboundEvent, Keyboard, OutboundMessage, Participant};
use crate::completion_client::{CompletionClient, CompletionRequest};
use crate::models::transcript::{NewTranscript, Turn};
use crate::store::{StoreError, TranscriptStore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterviewError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Drives one interview per participant: begin, collect answers, decide the
/// next prompt, and on termination summarise, save and report.
pub struct InterviewMachine {
    sessions: Arc<SessionStore>,
    completion: Arc<dyn CompletionClient>,
    summarizer: SummaryGenerator,
    store: Arc<dyn TranscriptStore>,
    channel: Arc<dyn Channel>,
    settings: InterviewSettings,
}

impl InterviewMachine {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        store: Arc<dyn TranscriptStore>,
        channel: Arc<dyn Channel>,
        settings: InterviewSettings,
    ) -> Self {
        let summarizer = SummaryGenerator::new(
            completion.clone(),
            settings.script.summary_instruction.clone(),
            settings.script.summary_fallback.clone(),
        )
        .with_model(settings.summary_model.clone());

        Self {
            sessions: Arc::new(SessionStore::new()),
            completion,
            summarizer,
            store,
            channel,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn handle(
        &self,
        participant: &Participant,
        event: InboundEvent,
    ) -> Result<(), InterviewError> {
        match event {
            InboundEvent::Greet => self.greet(participant).await,
            InboundEvent::Begin => self.begin(participant).await,
            InboundEvent::Cancel => self.cancel(participant).await,
            InboundEvent::End => self.end(participant).await,
            InboundEvent::Text(text) => self.answer(participant, &text).await,
        }
    }

    async fn send(
        &self,
        participant: &Participant,
        message: OutboundMessage,
    ) -> Result<(), InterviewError> {
        self.channel.send(participant.chat_id, message).await?;
        Ok(())
    }

    /// Send without failing the caller; used for messages that must not stop
    /// an interview from being saved.
    async fn notify(&self, participant: &Participant, message: OutboundMessage) {
        if let Err(e) = self.channel.send(participant.chat_id, message).await {
            tracing::warn!(participant_id = participant.id, "Failed to deliver message: {}", e);
        }
    }

    /// The first prompt of an interview also clears the begin/cancel keyboard.
    fn prompt_message(text: impl Into<String>, first: bool) -> OutboundMessage {
        let message = OutboundMessage::text(text);
        if first {
            message.with_keyboard(Keyboard::Remove)
        } else {
            message
        }
    }

    async fn greet(&self, participant: &Participant) -> Result<(), InterviewError> {
        tracing::info!(participant_id = participant.id, "Participant opened the bot");
        let script = &self.settings.script;
        let message = OutboundMessage::text(script.greeting.clone())
            .with_keyboard(Keyboard::Choices(script.keyboard_labels()));
        self.send(participant, message).await
    }

    async fn begin(&self, participant: &Participant) -> Result<(), InterviewError> {
        if self.sessions.is_active(participant.id).await {
            tracing::info!(participant_id = participant.id, "Restarting an active interview");
        } else {
            let active = self.sessions.active_count().await;
            tracing::info!(participant_id = participant.id, active, "Interview started");
        }

        let mut session = Session::start(participant);

        match &self.settings.policy {
            Policy::FixedList { questions } => {
                if questions.is_empty() {
                    tracing::warn!("Question list is empty, finishing immediately");
                    return self.finish(participant, session).await;
                }
                let prompt = self.present_question(questions, 0);
                session.question_index = Some(0);
                session.last_prompt = prompt.clone();
                self.sessions.put(session).await;
                self.send(participant, Self::prompt_message(prompt, true)).await
            }
            Policy::Sentinel { .. } | Policy::Structured => {
                self.sessions.put(session.clone()).await;
                self.advance(participant, session, true).await
            }
        }
    }

    async fn answer(&self, participant: &Participant, text: &str) -> Result<(), InterviewError> {
        let Some(mut session) = self.sessions.get(participant.id).await else {
            tracing::debug!(participant_id = participant.id, "Message outside of an interview");
            return match &self.settings.script.idle_hint {
                Some(hint) => self.send(participant, OutboundMessage::text(hint.clone())).await,
                None => Ok(()),
            };
        };

        let answer = text.trim();

        if let Policy::FixedList { questions } = &self.settings.policy {
            return self.answer_fixed(participant, session, questions, answer).await;
        }

        session.record_answer(answer);
        self.sessions.put(session.clone()).await;
        self.advance(participant, session, false).await
    }

    async fn answer_fixed(
        &self,
        participant: &Participant,
        mut session: Session,
        questions: &[Question],
        answer: &str,
    ) -> Result<(), InterviewError> {
        let index = session.question_index.unwrap_or(0);

        if answer.is_empty() && questions.get(index).map_or(false, |q| q.required) {
            let reminder = self.settings.script.required_answer.clone();
            return self.send(participant, OutboundMessage::text(reminder)).await;
        }

        session.record_answer(answer);

        let next = index + 1;
        if next < questions.len() {
            let prompt = self.present_question(questions, next);
            session.question_index = Some(next);
            session.last_prompt = prompt.clone();
            self.sessions.put(session).await;
            self.send(participant, OutboundMessage::text(prompt)).await
        } else {
            self.finish(participant, session).await
        }
    }

    fn present_question(&self, questions: &[Question], index: usize) -> String {
        let script = &self.settings.script;
        let question = &questions[index];

        let mut text = if script.number_questions {
            format!("Question {}/{}:\n{}", index + 1, questions.len(), question.text)
        } else {
            question.text.clone()
        };
        if !question.required {
            text.push_str("\n\n");
            text.push_str(&script.optional_marker);
        }
        text
    }

    fn prompt_request(&self, turns: &[Turn]) -> CompletionRequest {
        let script = &self.settings.script;
        let request = match &self.settings.policy {
            Policy::Structured => {
                CompletionRequest::from_turns(script.structured_instruction.clone(), turns)
                    .json_object()
            }
            Policy::Sentinel { marker, .. } => {
                CompletionRequest::from_turns(script.interview_instruction_for(marker), turns)
            }
            Policy::FixedList { .. } => {
                CompletionRequest::from_turns(script.interview_instruction_for(DEFAULT_MARKER), turns)
            }
        };
        request.with_temperature(self.settings.temperature)
    }

    /// Ask the completion service for the next prompt and act on its reply.
    async fn advance(
        &self,
        participant: &Participant,
        mut session: Session,
        first: bool,
    ) -> Result<(), InterviewError> {
        let request = self.prompt_request(&session.turns);

        let reply = match self.completion.complete(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    participant_id = participant.id,
                    "Failed to generate next question: {}",
                    e
                );
                let retry = self.settings.script.retry_later.clone();
                return self.send(participant, Self::prompt_message(retry, first)).await;
            }
        };

        match self.settings.policy.interpret(&reply) {
            Step::Ask(prompt) => {
                session.last_prompt = prompt.clone();
                self.sessions.put(session).await;
                self.send(participant, Self::prompt_message(prompt, first)).await
            }
            Step::Finish { farewell } => {
                if let Some(text) = farewell {
                    self.notify(participant, Self::prompt_message(text, first)).await;
                }
                self.finish(participant, session).await
            }
            Step::Drop(reason) => {
                tracing::warn!(
                    participant_id = participant.id,
                    "Dropping unusable completion reply: {}",
                    reason
                );
                Ok(())
            }
        }
    }

    async fn cancel(&self, participant: &Participant) -> Result<(), InterviewError> {
        let session = self.sessions.remove(participant.id).await;
        tracing::info!(
            participant_id = participant.id,
            was_active = session.is_some(),
            "Interview cancelled"
        );

        let ack = OutboundMessage::text(self.settings.script.cancelled.clone())
            .with_keyboard(Keyboard::Remove);

        match (session, self.settings.cancel_behavior) {
            (Some(session), CancelBehavior::Persist) => {
                self.notify(participant, ack).await;
                self.finish(participant, session).await
            }
            _ => self.send(participant, ack).await,
        }
    }

    async fn end(&self, participant: &Participant) -> Result<(), InterviewError> {
        match self.sessions.remove(participant.id).await {
            Some(session) => self.finish(participant, session).await,
            None => {
                let text = self.settings.script.not_active.clone();
                self.send(participant, OutboundMessage::text(text)).await
            }
        }
    }

    /// Summarise, save and report. The session is discarded even when saving fails.
    async fn finish(&self, participant: &Participant, session: Session) -> Result<(), InterviewError> {
        self.sessions.remove(participant.id).await;
        tracing::info!(
            participant_id = participant.id,
            turns = session.turns.len(),
            answers = session.user_turns(),
            "Finishing interview"
        );

        let script = &self.settings.script;
        if let Some(notice) = &script.closing_notice {
            self.notify(participant, OutboundMessage::text(notice.clone())).await;
        }

        match self.persist(session).await {
            Ok(summary) => {
                let report = script.completed_message(&summary);
                self.send(participant, OutboundMessage::text(report)).await
            }
            Err(e) => {
                tracing::error!(
                    participant_id = participant.id,
                    "Failed to save interview: {}",
                    e
                );
                let apology = script.persist_failed.clone();
                self.notify(participant, OutboundMessage::text(apology)).await;
                Err(e.into())
            }
        }
    }

    async fn persist(&self, session: Session) -> Result<String, StoreError> {
        let mut transcript = NewTranscript {
            user_id: session.participant_id,
            username: session.username,
            start_time: session.started_at,
            end_time: now_timestamp(),
            dialog: session.turns,
            summary: String::new(),
        };

        match self.settings.summary_mode {
            SummaryMode::Inline => {
                transcript.summary = self.summarizer.generate(&transcript.dialog).await;
                self.store.insert(&transcript).await?;
                Ok(transcript.summary)
            }
            SummaryMode::Deferred => {
                let id = self.store.insert(&transcript).await?;
                let summary = self.summarizer.generate(&transcript.dialog).await;
                self.store.update_summary(id, &summary).await?;
                Ok(summary)
            }
        }
    }
}
