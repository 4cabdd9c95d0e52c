use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AnswerValue, Credentials},
};

/// Body of `POST /quiz`. Fields are optional here so a missing field is
/// reported as a validation error rather than a deserialisation failure.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StartQuizRequest {
    #[validate(length(min = 1, max = 320))]
    pub email: Option<String>,

    #[validate(length(min = 1))]
    pub secret: Option<String>,

    #[validate(url)]
    pub url: Option<String>,
}

/// Start request after validation.
#[derive(Debug, Clone)]
pub struct ValidStartRequest {
    pub email: String,
    pub secret: String,
    pub url: String,
}

impl StartQuizRequest {
    /// Parses a raw body. Anything other than a JSON object is rejected.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|_| AppError::ValidationError("JSON decode error".to_string()))?;

        if !value.is_object() {
            return Err(AppError::ValidationError("Expected JSON object".to_string()));
        }

        serde_json::from_value(value).map_err(|e| AppError::ValidationError(e.to_string()))
    }

    pub fn into_valid(self) -> AppResult<ValidStartRequest> {
        self.validate()?;

        match (self.email, self.secret, self.url) {
            (Some(email), Some(secret), Some(url))
                if !email.trim().is_empty() && !secret.is_empty() && !url.trim().is_empty() =>
            {
                Ok(ValidStartRequest { email, secret, url })
            }
            _ => Err(AppError::ValidationError(
                "Fields 'email', 'secret' and 'url' are required".to_string(),
            )),
        }
    }
}

/// JSON payload posted to a submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionEnvelope {
    pub email: String,
    pub secret: String,
    pub url: String,
    pub answer: AnswerValue,
}

impl SubmissionEnvelope {
    pub fn new(credentials: &Credentials, url: &str, answer: AnswerValue) -> Self {
        Self {
            email: credentials.email.clone(),
            secret: credentials.secret.expose_secret().to_string(),
            url: url.to_string(),
            answer,
        }
    }

    /// Envelope for the failure-reporting endpoint.
    pub fn diagnostic(credentials: &Credentials, url: &str, message: impl Into<String>) -> Self {
        Self::new(credentials, url, AnswerValue::Text(message.into()))
    }
}
