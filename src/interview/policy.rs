// src/interview/policy.rs
//! How the next prompt is chosen and when an interview ends.

use crate::completion_client::parse_structured;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::str::FromStr;

pub const DEFAULT_MARKER: &str = "STOP";

/// Where the stop marker may appear in a free-text reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelMatch {
    /// Marker anywhere in the text; every occurrence is removed
    Anywhere,
    /// Marker only at the end of the text (trailing whitespace ignored)
    Suffix,
}

impl SentinelMatch {
    /// Returns the participant-visible remainder when `reply` carries the marker.
    pub fn strip(&self, reply: &str, marker: &str) -> Option<String> {
        if marker.is_empty() {
            return None;
        }
        match self {
            SentinelMatch::Anywhere => reply
                .contains(marker)
                .then(|| reply.replace(marker, "")),
            SentinelMatch::Suffix => reply
                .trim_end()
                .strip_suffix(marker)
                .map(str::to_string),
        }
    }
}

impl FromStr for SentinelMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anywhere" | "contains" => Ok(SentinelMatch::Anywhere),
            "suffix" | "ends_with" => Ok(SentinelMatch::Suffix),
            other => Err(format!("unknown sentinel mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            required: true,
        }
    }
}

/// On-disk shape of a question list: `{"questions": [{"id", "text", "required"}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionList {
    pub questions: Vec<Question>,
}

pub fn builtin_questions() -> Vec<Question> {
    [
        "1. Describe in one or two paragraphs the main factor behind your decision to leave. Why was it the critical one?",
        "2. Tell us about other factors (up to three) that also influenced your decision. Why did they matter to you?",
        "3. Do you currently have a job offer? If so, which company is it from and what attracted you? If not, why not?",
        "4. Give the full name of the manager who set your tasks and gave you feedback.",
        "5. How was your relationship with your direct manager? Give examples of good or difficult interactions.",
        "6. Describe the psychological climate in your team: what helped and what got in the way of working comfortably?",
        "7. How do you rate your opportunities for professional development here? What barriers or opportunities did you see?",
        "8. In your experience, how much did the company care about employee wellbeing? Give examples of support or the lack of it.",
        "9. What do you think should be changed, introduced or improved in processes, the team or the company as a whole? Give concrete suggestions.",
    ]
    .into_iter()
    .map(Question::new)
    .collect()
}

/// Reply shape requested from the model by the structured policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuredReply {
    pub answer: String,
    #[serde(
        rename = "is_enough",
        alias = "sufficient",
        deserialize_with = "deserialize_sufficiency"
    )]
    pub sufficient: bool,
    #[serde(default)]
    pub explanation: String,
}

fn deserialize_sufficiency<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Word(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Word(word) => match word.trim().to_lowercase().as_str() {
            "да" | "yes" | "true" => Ok(true),
            "нет" | "no" | "false" => Ok(false),
            other => Err(de::Error::custom(format!(
                "unrecognised sufficiency flag '{}'",
                other
            ))),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Policy {
    /// Free-text replies; the model ends the interview with a stop marker
    Sentinel { marker: String, matching: SentinelMatch },
    /// JSON replies carrying an explicit "enough information" flag
    Structured,
    /// A fixed question list; the model is only used for the final report
    FixedList { questions: Vec<Question> },
}

impl Policy {
    pub fn sentinel() -> Self {
        Policy::Sentinel {
            marker: DEFAULT_MARKER.to_string(),
            matching: SentinelMatch::Anywhere,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Sentinel { .. } => "sentinel",
            Policy::Structured => "structured",
            Policy::FixedList { .. } => "fixed_list",
        }
    }

    /// Decide what to do with a completion reply. Not meaningful for `FixedList`.
    pub fn interpret(&self, reply: &str) -> Step {
        match self {
            Policy::Sentinel { marker, matching } => match matching.strip(reply, marker) {
                Some(rest) => Step::Finish {
                    farewell: Some(rest).filter(|text| !text.trim().is_empty()),
                },
                None => ask(reply.to_string()),
            },
            Policy::Structured => match parse_structured::<StructuredReply>(reply) {
                Ok(parsed) => {
                    tracing::debug!(
                        sufficient = parsed.sufficient,
                        "Structured reply: {}",
                        parsed.explanation
                    );
                    if parsed.sufficient {
                        Step::Finish {
                            farewell: Some(parsed.answer).filter(|text| !text.trim().is_empty()),
                        }
                    } else {
                        ask(parsed.answer)
                    }
                }
                Err(e) => Step::Drop(e.to_string()),
            },
            Policy::FixedList { .. } => Step::Ask(reply.to_string()),
        }
    }
}

/// A blank prompt cannot be delivered, so it is treated as an unusable reply.
fn ask(prompt: String) -> Step {
    if prompt.trim().is_empty() {
        Step::Drop("empty prompt".to_string())
    } else {
        Step::Ask(prompt)
    }
}

/// Outcome of interpreting one completion reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Send this prompt and wait for the next answer
    Ask(String),
    /// Deliver the farewell (if any) and finish the interview
    Finish { farewell: Option<String> },
    /// Reply was unusable; nothing is sent
    Drop(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anywhere_strips_every_marker() {
        let m = SentinelMatch::Anywhere;
        assert_eq!(m.strip("Tell me more. STOP", "STOP").as_deref(), Some("Tell me more. "));
        assert_eq!(m.strip("STOP Thanks STOP", "STOP").as_deref(), Some(" Thanks "));
        assert_eq!(m.strip("Keep going", "STOP"), None);
    }

    #[test]
    fn test_suffix_only_matches_trailing_marker() {
        let m = SentinelMatch::Suffix;
        assert_eq!(m.strip("Tell me more. STOP", "STOP").as_deref(), Some("Tell me more. "));
        assert_eq!(m.strip("Thanks!\nSTOP\n", "STOP").as_deref(), Some("Thanks!\n"));
        assert_eq!(m.strip("Did STOP signs bother you?", "STOP"), None);
    }

    #[test]
    fn test_empty_marker_never_matches() {
        assert_eq!(SentinelMatch::Anywhere.strip("anything", ""), None);
    }

    #[test]
    fn test_sentinel_interpret() {
        let policy = Policy::sentinel();
        assert_eq!(policy.interpret("Why?"), Step::Ask("Why?".to_string()));
        assert_eq!(
            policy.interpret("Thank you. STOP"),
            Step::Finish { farewell: Some("Thank you. ".to_string()) }
        );
        assert_eq!(policy.interpret("STOP"), Step::Finish { farewell: None });
    }

    #[test]
    fn test_blank_prompt_is_dropped() {
        assert!(matches!(Policy::sentinel().interpret("   "), Step::Drop(_)));
        assert!(matches!(
            Policy::Structured.interpret(r#"{"answer": " ", "is_enough": "no"}"#),
            Step::Drop(_)
        ));
    }

    #[test]
    fn test_structured_interpret() {
        let policy = Policy::Structured;
        assert_eq!(
            policy.interpret(r#"{"answer": "Could you elaborate?", "is_enough": "нет", "explanation": "vague"}"#),
            Step::Ask("Could you elaborate?".to_string())
        );
        assert_eq!(
            policy.interpret(r#"{"answer": "Thanks!", "is_enough": "yes", "explanation": "done"}"#),
            Step::Finish { farewell: Some("Thanks!".to_string()) }
        );
        assert_eq!(
            policy.interpret(r#"{"answer": "Bye", "sufficient": true}"#),
            Step::Finish { farewell: Some("Bye".to_string()) }
        );
        assert!(matches!(policy.interpret("plain text"), Step::Drop(_)));
        assert!(matches!(
            policy.interpret(r#"{"answer": "x", "is_enough": "maybe"}"#),
            Step::Drop(_)
        ));
    }

    #[test]
    fn test_question_list_defaults_required() {
        let list: QuestionList = serde_json::from_str(
            r#"{"questions": [{"id": "q1", "text": "Why?"}, {"text": "Anything else?", "required": false}]}"#,
        )
        .unwrap();
        assert!(list.questions[0].required);
        assert_eq!(list.questions[0].id.as_deref(), Some("q1"));
        assert!(!list.questions[1].required);
    }

    #[test]
    fn test_sentinel_mode_from_str() {
        assert_eq!("suffix".parse::<SentinelMatch>(), Ok(SentinelMatch::Suffix));
        assert_eq!("Anywhere".parse::<SentinelMatch>(), Ok(SentinelMatch::Anywhere));
        assert!("sometimes".parse::<SentinelMatch>().is_err());
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(Policy::sentinel().name(), "sentinel");
        assert_eq!(Policy::FixedList { questions: builtin_questions() }.name(), "fixed_list");
    }

    #[test]
    fn test_builtin_questions() {
        let questions = builtin_questions();
        assert_eq!(questions.len(), 9);
        assert!(questions.iter().all(|q| q.required));
    }
}
