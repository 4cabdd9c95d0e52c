use serde::Serialize;

pub const UNDETERMINED_ANSWER: &str = "Error: AI could not determine the answer.";

/// Answer submitted for one quiz page.
///
/// `ErrorMarker` is submitted like any other value: when nothing can be
/// resolved the agent reports why instead of going silent.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Integer(i64),
    Text(String),
    Structured(serde_json::Value),
    ErrorMarker(String),
}

impl AnswerValue {
    pub fn error(message: impl Into<String>) -> Self {
        AnswerValue::ErrorMarker(message.into())
    }

    pub fn undetermined() -> Self {
        AnswerValue::ErrorMarker(UNDETERMINED_ANSWER.to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnswerValue::ErrorMarker(_))
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnswerValue::Integer(n) => write!(f, "{}", n),
            AnswerValue::Text(text) => write!(f, "{}", text),
            AnswerValue::Structured(value) => write!(f, "{}", value),
            AnswerValue::ErrorMarker(message) => write!(f, "[error] {}", message),
        }
    }
}
