// src/interview/mod.rs
//! Exit-interview conversation: sessions, policies, the state machine and the final report.

use std::str::FromStr;

pub mod machine;
pub mod policy;
pub mod script;
pub mod session;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

pub use machine::{InterviewError, InterviewMachine};
pub use policy::{Policy, Question, SentinelMatch, Step, StructuredReply};
pub use script::Script;
pub use session::{Session, SessionStore};
pub use summary::SummaryGenerator;

/// What a cancel does with the answers collected so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelBehavior {
    #[default]
    Discard,
    /// Summarise and save the partial interview
    Persist,
}

impl FromStr for CancelBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discard" => Ok(CancelBehavior::Discard),
            "persist" => Ok(CancelBehavior::Persist),
            other => Err(format!("unknown cancel behavior '{}'", other)),
        }
    }
}

/// When the report is written to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryMode {
    /// Generate first, then insert the complete row
    #[default]
    Inline,
    /// Insert with an empty summary, then update that row by id
    Deferred,
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(SummaryMode::Inline),
            "deferred" => Ok(SummaryMode::Deferred),
            other => Err(format!("unknown summary mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterviewSettings {
    pub policy: Policy,
    pub cancel_behavior: CancelBehavior,
    pub summary_mode: SummaryMode,
    pub script: Script,
    /// Sampling temperature for question generation
    pub temperature: Option<f32>,
    /// Model used for the final report; the client default when unset
    pub summary_model: Option<String>,
}

impl Default for InterviewSettings {
    fn default() -> Self {
        Self {
            policy: Policy::sentinel(),
            cancel_behavior: CancelBehavior::default(),
            summary_mode: SummaryMode::default(),
            script: Script::default(),
            temperature: Some(0.7),
            summary_model: None,
        }
    }
}
