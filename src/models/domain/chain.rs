use std::collections::HashSet;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use uuid::Uuid;

/// Credentials echoed back in every envelope of one run.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub secret: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Running,
    Retrying,
    TerminatedOk,
    TerminatedFail,
}

impl ChainStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainStatus::TerminatedOk | ChainStatus::TerminatedFail)
    }
}

impl std::fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainStatus::Running => write!(f, "running"),
            ChainStatus::Retrying => write!(f, "retrying"),
            ChainStatus::TerminatedOk => write!(f, "terminated_ok"),
            ChainStatus::TerminatedFail => write!(f, "terminated_fail"),
        }
    }
}

/// Why a run left the loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    ChainExhausted,
    LoopDetected(String),
    StepLimitReached,
    FetchFailed(String),
    NoSubmissionTarget,
    SubmissionFailed(String),
    RetriesExhausted,
}

impl StopReason {
    pub fn terminal_status(&self) -> ChainStatus {
        match self {
            StopReason::ChainExhausted | StopReason::LoopDetected(_) | StopReason::StepLimitReached => {
                ChainStatus::TerminatedOk
            }
            StopReason::FetchFailed(_)
            | StopReason::NoSubmissionTarget
            | StopReason::SubmissionFailed(_)
            | StopReason::RetriesExhausted => ChainStatus::TerminatedFail,
        }
    }
}

/// Cross-step memory of a single run. Never shared between runs.
#[derive(Debug)]
pub struct ChainState {
    pub run_id: Uuid,
    pub current_url: Option<String>,
    pub visited_urls: HashSet<String>,
    pub visit_order: Vec<String>,
    pub step_count: u32,
    pub max_steps: u32,
    pub status: ChainStatus,
    pub credentials: Credentials,
    pub started_at: DateTime<Utc>,
}

impl ChainState {
    pub fn new(start_url: impl Into<String>, credentials: Credentials, max_steps: u32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            current_url: Some(start_url.into()).filter(|u: &String| !u.trim().is_empty()),
            visited_urls: HashSet::new(),
            visit_order: Vec::new(),
            step_count: 0,
            max_steps,
            status: ChainStatus::Running,
            credentials,
            started_at: Utc::now(),
        }
    }

    /// Checks the loop guards for the current URL and, when the step may run,
    /// marks it visited and returns it.
    pub fn begin_step(&mut self) -> Result<String, StopReason> {
        let url = match self.current_url.clone() {
            Some(url) => url,
            None => return Err(StopReason::ChainExhausted),
        };
        if self.visited_urls.contains(&url) {
            return Err(StopReason::LoopDetected(url));
        }
        if self.step_count >= self.max_steps {
            return Err(StopReason::StepLimitReached);
        }

        self.visited_urls.insert(url.clone());
        self.visit_order.push(url.clone());
        Ok(url)
    }

    pub fn advance(&mut self, next_url: String) {
        self.current_url = Some(next_url).filter(|u| !u.trim().is_empty());
        self.step_count += 1;
        self.status = ChainStatus::Running;
    }

    pub fn finish(self, reason: StopReason) -> ChainReport {
        ChainReport {
            run_id: self.run_id,
            status: reason.terminal_status(),
            stop_reason: reason,
            step_count: self.step_count,
            visited: self.visit_order,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Summary of a finished run, logged when the background task ends.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub run_id: Uuid,
    pub status: ChainStatus,
    pub stop_reason: StopReason,
    pub step_count: u32,
    pub visited: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ChainReport {
    pub fn pages_visited(&self) -> usize {
        self.visited.len()
    }
}
