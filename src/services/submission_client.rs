use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    errors::{AgentError, AgentResult},
    models::{
        domain::Credentials,
        dto::{request::SubmissionEnvelope, response::SubmissionResult},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    /// Posts an envelope and parses the verdict.
    async fn submit(&self, url: &str, envelope: &SubmissionEnvelope) -> AgentResult<SubmissionResult>;
}

pub struct HttpSubmissionClient {
    client: Client,
}

impl HttpSubmissionClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(&self, url: &str, envelope: &SubmissionEnvelope) -> AgentResult<SubmissionResult> {
        let response = self
            .client
            .post(url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| AgentError::transport(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::transport(url, e))?;

        if !status.is_success() {
            log::warn!(
                "Submission to {} returned {}: {}",
                url,
                status,
                body.chars().take(200).collect::<String>()
            );
            return Err(AgentError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| AgentError::Protocol {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(SubmissionResult::from_json(&value))
    }
}

/// Side channel for failures the chain cannot recover from. Reporting never
/// fails the caller.
#[derive(Clone)]
pub struct DiagnosticReporter {
    submitter: Arc<dyn SubmissionClient>,
    endpoint: String,
}

impl DiagnosticReporter {
    pub fn new(submitter: Arc<dyn SubmissionClient>, endpoint: impl Into<String>) -> Self {
        Self {
            submitter,
            endpoint: endpoint.into(),
        }
    }

    pub async fn report(&self, credentials: &Credentials, failing_url: &str, message: &str) {
        log::info!("Reporting failure for {}: {}", failing_url, message);

        let envelope = SubmissionEnvelope::diagnostic(credentials, failing_url, message);
        if let Err(e) = self.submitter.submit(&self.endpoint, &envelope).await {
            log::warn!(
                "Diagnostic submission to {} failed ({}); {} {} {}",
                self.endpoint,
                e,
                credentials.email,
                failing_url,
                message
            );
        }
    }
}
