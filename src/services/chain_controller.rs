use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    errors::AgentError,
    models::{
        domain::{
            answer::UNDETERMINED_ANSWER, ChainReport, ChainState, ChainStatus, Credentials,
            StopReason,
        },
        dto::{request::SubmissionEnvelope, response::SubmissionResult},
    },
    services::{
        answer_resolver::AnswerResolver,
        page_fetcher::PageFetcher,
        submission_client::{DiagnosticReporter, SubmissionClient},
        task_classifier::{classify, find_submission_target},
    },
};

pub const MAX_STEPS: u32 = 20;
pub const RETRY_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const PACING_DELAY: Duration = Duration::from_millis(250);

/// Bounds and delays applied to one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPolicy {
    pub max_steps: u32,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub pacing_delay: Duration,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            max_steps: MAX_STEPS,
            retry_attempts: RETRY_ATTEMPTS,
            retry_delay: RETRY_DELAY,
            pacing_delay: PACING_DELAY,
        }
    }
}

impl ChainPolicy {
    /// Same bounds, no waiting.
    pub fn without_delays() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            pacing_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

enum StepOutcome {
    Advance(String),
    Stop(StopReason),
}

/// Walks a quiz chain: fetch, classify, resolve, submit, follow.
pub struct ChainController {
    fetcher: Arc<dyn PageFetcher>,
    resolver: Arc<dyn AnswerResolver>,
    submitter: Arc<dyn SubmissionClient>,
    diagnostics: DiagnosticReporter,
    policy: ChainPolicy,
}

impl ChainController {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        resolver: Arc<dyn AnswerResolver>,
        submitter: Arc<dyn SubmissionClient>,
        diagnostic_url: impl Into<String>,
    ) -> Self {
        let diagnostics = DiagnosticReporter::new(submitter.clone(), diagnostic_url);
        Self {
            fetcher,
            resolver,
            submitter,
            diagnostics,
            policy: ChainPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ChainPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ChainPolicy {
        &self.policy
    }

    /// Starts a run in the background and returns its id immediately.
    pub fn spawn_run(self: &Arc<Self>, start_url: String, credentials: Credentials) -> Uuid {
        let state = ChainState::new(start_url, credentials, self.policy.max_steps);
        let run_id = state.run_id;
        let controller = Arc::clone(self);

        tokio::spawn(async move {
            controller.drive(state).await;
        });

        run_id
    }

    /// Runs a chain to completion.
    pub async fn run(&self, start_url: impl Into<String>, credentials: Credentials) -> ChainReport {
        let state = ChainState::new(start_url, credentials, self.policy.max_steps);
        self.drive(state).await
    }

    async fn drive(&self, mut state: ChainState) -> ChainReport {
        log::info!(
            "[run {}] starting chain at {:?}",
            state.run_id,
            state.current_url
        );

        let reason = loop {
            let url = match state.begin_step() {
                Ok(url) => url,
                Err(reason) => break reason,
            };

            match self.run_step(&mut state, &url).await {
                StepOutcome::Advance(next_url) => {
                    log::info!("[run {}] advancing to {}", state.run_id, next_url);
                    state.advance(next_url);
                    tokio::time::sleep(self.policy.pacing_delay).await;
                }
                StepOutcome::Stop(reason) => break reason,
            }
        };

        let report = state.finish(reason);
        log::info!(
            "[run {}] finished chain processing: {} ({:?}) after {} page(s)",
            report.run_id,
            report.status,
            report.stop_reason,
            report.pages_visited()
        );
        report
    }

    async fn run_step(&self, state: &mut ChainState, url: &str) -> StepOutcome {
        let run_id = state.run_id;

        let page = match self.fetcher.fetch_page(url).await {
            Ok(page) => page,
            Err(e) => {
                log::error!("[run {}] failed to fetch {}: {}", run_id, url, e);
                let message = fetch_failure_message(url, &e);
                self.diagnostics.report(&state.credentials, url, &message).await;
                return StepOutcome::Stop(StopReason::FetchFailed(e.to_string()));
            }
        };

        let task = classify(&page);
        log::info!(
            "[run {}] ({}) {} classified as {}",
            run_id,
            state.status,
            url,
            task.kind()
        );
        let answer = self.resolver.resolve(&task).await;

        let Some(target) = find_submission_target(&page) else {
            log::warn!("[run {}] no submit URL found on page {}, stopping", run_id, url);
            return StepOutcome::Stop(StopReason::NoSubmissionTarget);
        };

        log::info!("[run {}] submitting {} to {}", run_id, answer, target);
        let envelope = SubmissionEnvelope::new(&state.credentials, url, answer);

        let verdict = match self.submitter.submit(&target, &envelope).await {
            Ok(verdict) => verdict,
            Err(e) => {
                log::error!("[run {}] failed to POST to {}: {}", run_id, target, e);
                let message = format!("Error: submission failed: {}", e);
                self.diagnostics.report(&state.credentials, url, &message).await;
                return StepOutcome::Stop(StopReason::SubmissionFailed(e.to_string()));
            }
        };

        let verdict = if verdict.needs_retry() {
            state.status = ChainStatus::Retrying;
            log::info!("[run {}] ({}) {} needs another attempt", run_id, state.status, url);
            match self.retry(run_id, &target, &envelope, verdict).await {
                Some(accepted) => accepted,
                None => {
                    self.diagnostics
                        .report(&state.credentials, url, UNDETERMINED_ANSWER)
                        .await;
                    return StepOutcome::Stop(StopReason::RetriesExhausted);
                }
            }
        } else {
            verdict
        };

        match verdict.next_url {
            Some(next_url) => StepOutcome::Advance(next_url),
            None => StepOutcome::Stop(StopReason::ChainExhausted),
        }
    }

    /// Re-submits the same envelope until one attempt is accepted or the
    /// budget runs out.
    async fn retry(
        &self,
        run_id: Uuid,
        target: &str,
        envelope: &SubmissionEnvelope,
        rejected: SubmissionResult,
    ) -> Option<SubmissionResult> {
        let mut reason = rejected.reason;

        for attempt in 1..=self.policy.retry_attempts {
            log::info!(
                "[run {}] received correct=false from {}, reason={:?}. Retrying attempt {}",
                run_id,
                target,
                reason,
                attempt
            );
            tokio::time::sleep(self.policy.retry_delay).await;

            match self.submitter.submit(target, envelope).await {
                Ok(verdict) if verdict.explicitly_correct => return Some(verdict),
                Ok(verdict) => reason = verdict.reason,
                Err(e) => {
                    log::warn!("[run {}] retry attempt {} failed: {}", run_id, attempt, e);
                }
            }
        }

        None
    }
}

fn fetch_failure_message(url: &str, err: &AgentError) -> String {
    match err {
        AgentError::HttpStatus { status, .. } => format!("Error: HTTP {} for {}", status, url),
        other => format!("Error: could not fetch {}: {}", url, other),
    }
}
