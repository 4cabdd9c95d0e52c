use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct StartQuizResponse {
    pub message: String,
    pub run_id: Uuid,
}

/// Verdict returned by a submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub correct: bool,
    /// Set only when the body carried `"correct": true` itself.
    pub explicitly_correct: bool,
    pub next_url: Option<String>,
    pub reason: Option<String>,
}

impl Default for SubmissionResult {
    fn default() -> Self {
        Self {
            correct: true,
            explicitly_correct: false,
            next_url: None,
            reason: None,
        }
    }
}

impl SubmissionResult {
    /// Reads `correct`, `url` and `reason` from a JSON verdict. Any shape other
    /// than an object yields the defaults.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let correct = object.get("correct").and_then(Value::as_bool);

        Self {
            correct: correct.unwrap_or(true),
            explicitly_correct: correct == Some(true),
            next_url: object
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            reason: object
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// Wrong answer with nowhere to go: the only case that triggers a retry.
    pub fn needs_retry(&self) -> bool {
        !self.correct && self.next_url.is_none()
    }
}
