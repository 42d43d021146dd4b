// src/config.rs
//! Startup configuration read from the environment (after `.env` is loaded).

use crate::completion_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::interview::policy::{builtin_questions, QuestionList, DEFAULT_MARKER};
use crate::interview::{CancelBehavior, InterviewSettings, Policy, Script, SentinelMatch, SummaryMode};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://interviews.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Everything the bot binary needs.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub telegram_token: String,
    pub completion: CompletionSettings,
    pub database_url: String,
    pub interview: InterviewSettings,
}

/// Everything the query service needs.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub database_url: String,
    pub bind_addr: String,
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Non-blank value for `key`, if any.
fn value(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value(lookup, key).ok_or(ConfigError::Missing(key))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value(lookup, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_string(),
        source,
    })
}

impl BotSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let completion = CompletionSettings {
            api_key: required(&lookup, "OPENROUTER_API_KEY")?,
            base_url: value(&lookup, "OPENROUTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: value(&lookup, "COMPLETION_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        Ok(Self {
            telegram_token: required(&lookup, "TELEGRAM_BOT_TOKEN")?,
            completion,
            database_url: value(&lookup, "DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            interview: interview_settings(&lookup)?,
        })
    }
}

impl ApiSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: value(&lookup, "DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: value(&lookup, "BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

fn interview_settings(lookup: &impl Fn(&str) -> Option<String>) -> Result<InterviewSettings, ConfigError> {
    let script = match value(lookup, "SCRIPT_FILE") {
        Some(path) => read_json::<Script>(&path)?,
        None => Script::default(),
    };

    let policy_name = value(lookup, "INTERVIEW_POLICY").unwrap_or_else(|| "sentinel".to_string());
    let policy = match policy_name.to_lowercase().as_str() {
        "sentinel" => {
            // An explicitly blank marker is rejected rather than silently defaulted
            let marker = match lookup("SENTINEL_MARKER") {
                Some(raw) if raw.trim().is_empty() => {
                    return Err(ConfigError::Invalid {
                        key: "SENTINEL_MARKER",
                        reason: "marker must not be empty".to_string(),
                    })
                }
                Some(raw) => raw.trim().to_string(),
                None => DEFAULT_MARKER.to_string(),
            };
            Policy::Sentinel {
                marker,
                matching: parsed(lookup, "SENTINEL_MODE")?.unwrap_or(SentinelMatch::Anywhere),
            }
        }
        "structured" => Policy::Structured,
        "fixed_list" | "fixed" => {
            let questions = match value(lookup, "QUESTIONS_FILE") {
                Some(path) => read_json::<QuestionList>(&path)?.questions,
                None => builtin_questions(),
            };
            Policy::FixedList { questions }
        }
        other => {
            return Err(ConfigError::Invalid {
                key: "INTERVIEW_POLICY",
                reason: format!("unknown policy '{}'", other),
            })
        }
    };

    Ok(InterviewSettings {
        policy,
        cancel_behavior: parsed(lookup, "CANCEL_BEHAVIOR")?.unwrap_or_default(),
        summary_mode: parsed::<SummaryMode>(lookup, "SUMMARY_MODE")?.unwrap_or_default(),
        script,
        temperature: Some(parsed(lookup, "COMPLETION_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE)),
        summary_model: value(lookup, "SUMMARY_MODEL"),
    })
}
