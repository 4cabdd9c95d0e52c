use std::{sync::Arc, time::Duration};

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use schemars::{schema_for, JsonSchema};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::{
    constants::prompts::{ANSWER_CONTRACT_PROMPT, IMAGE_DESCRIBE_PROMPT, QUESTION_ANSWER_PROMPT},
    errors::{AgentError, AgentResult},
    models::domain::{AnswerValue, Task},
    services::{answer_resolver::AnswerResolver, page_fetcher::PageFetcher},
};

/// Shape every model reply must have.
#[derive(Debug, JsonSchema)]
pub struct ModelAnswer {
    /// Number, string, boolean or object answering the question.
    pub answer: Value,
}

static ANSWER_CONTRACT: Lazy<String> = Lazy::new(|| {
    let schema = serde_json::to_string_pretty(&schema_for!(ModelAnswer)).unwrap_or_default();
    format!("{}{}", ANSWER_CONTRACT_PROMPT, schema)
});

/// One request to a chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrompt {
    pub system: String,
    pub text: String,
    pub image_data_url: Option<String>,
}

impl ModelPrompt {
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            system: ANSWER_CONTRACT.clone(),
            text: text.into(),
            image_data_url: None,
        }
    }

    pub fn with_image(mut self, data_url: String) -> Self {
        self.image_data_url = Some(data_url);
        self
    }

    fn user_content(&self) -> Value {
        match &self.image_data_url {
            Some(url) => json!([
                { "type": "text", "text": self.text },
                { "type": "image_url", "image_url": { "url": url } }
            ]),
            None => Value::String(self.text.clone()),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the raw text content of the model's reply.
    async fn complete(&self, prompt: ModelPrompt) -> AgentResult<String>;
}

pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiModel {
    pub fn new(
        api_key: &SecretString,
        api_base: Option<&str>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }

        Self {
            client: Client::with_config(config),
            model: model.into(),
            timeout,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, prompt: ModelPrompt) -> AgentResult<String> {
        let request = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user_content() }
            ],
            "response_format": { "type": "json_object" }
        });

        let response: Value = tokio::time::timeout(self.timeout, self.client.chat().create_byot(request))
            .await
            .map_err(|_| AgentError::Model(format!("no reply within {:?}", self.timeout)))??;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AgentError::Model("reply has no message content".to_string()))
    }
}

/// Enforces the reply contract: one JSON object carrying an `answer` key.
/// Value types are kept as given; anything else becomes an error marker.
pub fn parse_model_answer(raw: &str) -> AnswerValue {
    let body = strip_code_fence(raw);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Model reply is not valid JSON: {}", e);
            return AnswerValue::error("Error: model response is not valid JSON");
        }
    };

    let Some(object) = value.as_object() else {
        return AnswerValue::error("Error: model response is not a JSON object");
    };

    match object.get("answer") {
        None => AnswerValue::error("Error: model response is missing the 'answer' key"),
        Some(Value::Null) => AnswerValue::undetermined(),
        Some(Value::String(text)) => AnswerValue::Text(text.clone()),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => AnswerValue::Integer(i),
            None => AnswerValue::Structured(Value::Number(n.clone())),
        },
        Some(other) => AnswerValue::Structured(other.clone()),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // drop the language tag line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn guess_image_mime(url: &str, content_type: Option<&str>) -> String {
    if let Some(ct) = content_type.filter(|ct| ct.starts_with("image/")) {
        return ct.to_string();
    }

    let lower = url.to_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg".to_string()
    } else {
        "image/png".to_string()
    }
}

/// Sends the referenced image to a vision-capable model.
pub struct ModelImageResolver {
    fetcher: Arc<dyn PageFetcher>,
    model: Arc<dyn LanguageModel>,
}

impl ModelImageResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, model: Arc<dyn LanguageModel>) -> Self {
        Self { fetcher, model }
    }
}

#[async_trait]
impl AnswerResolver for ModelImageResolver {
    async fn resolve(&self, task: &Task) -> AnswerValue {
        let Task::ImageDescribe {
            resource: Some(url),
            question,
        } = task
        else {
            return AnswerValue::undetermined();
        };

        let image = match self.fetcher.fetch_resource(url).await {
            Ok(image) if image.is_ok() => image,
            Ok(image) => {
                return AnswerValue::error(format!(
                    "Error during AI analysis: could not fetch image {} (status {})",
                    url, image.status
                ))
            }
            Err(e) => return AnswerValue::error(format!("Error during AI analysis: {}", e)),
        };

        let data_url = format!(
            "data:{};base64,{}",
            guess_image_mime(url, image.content_type.as_deref()),
            STANDARD.encode(&image.bytes)
        );
        let prompt =
            ModelPrompt::question(format!("{}{}", IMAGE_DESCRIBE_PROMPT, question)).with_image(data_url);

        match self.model.complete(prompt).await {
            Ok(raw) => parse_model_answer(&raw),
            Err(e) => AnswerValue::error(format!("Error during AI analysis: {}", e)),
        }
    }
}

/// Asks a text model about pages no heuristic recognised.
pub struct ModelTextResolver {
    model: Arc<dyn LanguageModel>,
}

impl ModelTextResolver {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl AnswerResolver for ModelTextResolver {
    async fn resolve(&self, task: &Task) -> AnswerValue {
        let Task::Unknown { page_text } = task else {
            return AnswerValue::undetermined();
        };

        let prompt = ModelPrompt::question(format!("{}{}", QUESTION_ANSWER_PROMPT, page_text));
        match self.model.complete(prompt).await {
            Ok(raw) => parse_model_answer(&raw),
            Err(e) => AnswerValue::error(format!("Error during AI analysis: {}", e)),
        }
    }
}
