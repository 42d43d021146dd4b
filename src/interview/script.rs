// src/interview/script.rs
//! Participant-facing texts and system instructions. Every field can be
//! overridden from a JSON file; missing fields keep their defaults.

use serde::{Deserialize, Serialize};

pub const INTERVIEW_INSTRUCTION: &str = "\
You are a professional HR interviewer collecting feedback from employees who are leaving the company.
Ask questions one at a time, ask for details when needed, but never pressure the participant.
Follow this procedure:

1. Ask strictly one question at a time
2. If an answer is incomplete, ask one or two clarifying questions
3. If the participant refuses to answer, move straight on to the next topic
4. Keep a neutral, friendly tone
5. When every key topic has been covered, or the participant does not want to continue, close the dialog and send {marker}

Topics to cover, in this order:
1. The main reason for leaving
2. Other factors, if any
3. Whether they have a job offer
4. The full name of their manager
5. Their relationship with the manager
6. The psychological climate in the team
7. Opportunities for professional growth
8. Suggestions for improvement

Never ask more than 15 questions. If the participant turns hostile, close the dialog immediately and send {marker}.";

pub const STRUCTURED_INSTRUCTION: &str = r#"Reply in JSON that strictly follows this schema:

{
  "type": "object",
  "properties": {
    "answer": {"type": "string", "description": "The next message to show the participant"},
    "is_enough": {"type": "string", "enum": ["yes", "no"], "description": "Whether enough information has been collected to finish the interview"},
    "explanation": {"type": "string", "description": "Briefly why the information is or is not sufficient"}
  },
  "required": ["answer", "is_enough", "explanation"]
}

The goal of the interview is to understand why the employee is leaving, get feedback on how the company works, and collect their suggestions.
Be polite but brief, ask one question at a time and adapt to the answers. Try to follow this outline:
main factor, other factors (up to three), job offer, manager's full name, relationship with the direct manager,
psychological climate, professional development, what should change.
If you see that the participant does not want to continue, finish the interview."#;

pub const SUMMARY_INSTRUCTION: &str = "\
You are an HR analyst. Analyse the following exit-interview dialog and write a short, structured report.
The report must clearly cover:
1. The main reasons for leaving (primary and secondary).
2. Feedback about the manager and the team.
3. Feedback about processes, development and wellbeing in the company.
4. The employee's concrete suggestions for improvement.
5. The overall tone of the interview (for example constructive, negative, neutral).
Write in an impersonal, professional style.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub greeting: String,
    pub begin_label: String,
    pub cancel_label: String,
    pub cancelled: String,
    pub retry_later: String,
    pub summary_fallback: String,
    /// `{summary}` is replaced with the generated report
    pub completed: String,
    pub persist_failed: String,
    pub not_active: String,
    /// Sent in reply to free text when no interview is running
    pub idle_hint: Option<String>,
    /// Sent before the report is generated
    pub closing_notice: Option<String>,
    pub required_answer: String,
    pub optional_marker: String,
    pub number_questions: bool,
    /// `{marker}` is replaced with the configured stop marker
    pub interview_instruction: String,
    pub structured_instruction: String,
    pub summary_instruction: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            greeting: "Hello! I am an assistant to the HR team. I know you have decided to leave the company.\n\n\
                       We would really like to hear about your experience of working here, your thoughts, \
                       and what you think the company should change.\n\n\
                       Press \"Begin\" when you are ready."
                .to_string(),
            begin_label: "🔥 Begin".to_string(),
            cancel_label: "❌ Cancel".to_string(),
            cancelled: "Interview cancelled. You can start again with /start".to_string(),
            retry_later: "Something went wrong while preparing the next question. Please try again later."
                .to_string(),
            summary_fallback: "Could not generate the final report.".to_string(),
            completed: "Thank you for taking part!\nYour interview is complete.\n\nFinal report:\n\n{summary}"
                .to_string(),
            persist_failed: "Thank you for your answers! Unfortunately we could not save the interview."
                .to_string(),
            not_active: "There is no interview in progress.".to_string(),
            idle_hint: None,
            closing_notice: None,
            required_answer: "This question is required, please answer it.".to_string(),
            optional_marker: "(This question is optional)".to_string(),
            number_questions: false,
            interview_instruction: INTERVIEW_INSTRUCTION.to_string(),
            structured_instruction: STRUCTURED_INSTRUCTION.to_string(),
            summary_instruction: SUMMARY_INSTRUCTION.to_string(),
        }
    }
}

impl Script {
    pub fn completed_message(&self, summary: &str) -> String {
        self.completed.replace("{summary}", summary)
    }

    pub fn interview_instruction_for(&self, marker: &str) -> String {
        self.interview_instruction.replace("{marker}", marker)
    }

    pub fn keyboard_labels(&self) -> Vec<String> {
        vec![self.begin_label.clone(), self.cancel_label.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let script: Script =
            serde_json::from_str(r#"{"begin_label": "Start", "idle_hint": "Send /start"}"#).unwrap();
        assert_eq!(script.begin_label, "Start");
        assert_eq!(script.idle_hint.as_deref(), Some("Send /start"));
        assert_eq!(script.cancel_label, Script::default().cancel_label);
    }

    #[test]
    fn test_placeholders() {
        let script = Script::default();
        assert!(script.completed_message("R").ends_with("\n\nR"));
        let instruction = script.interview_instruction_for("DONE");
        assert!(instruction.contains("send DONE"));
        assert!(!instruction.contains("{marker}"));
    }
}
