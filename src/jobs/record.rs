//! Job record and lifecycle types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status visible to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Where the poll scheduler is with a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Registered, no poll issued yet
    Pending,
    /// Awaiting a terminal remote status
    Polling,
    /// Remote job finished; delivery claimed
    Completed,
    /// Polling stopped, either on failure-cap exhaustion or a remote failure
    FailedTerminal,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollPhase::Completed | PollPhase::FailedTerminal)
    }
}

/// A tracked image generation job
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// Identifier assigned by the remote service
    pub job_id: String,
    pub prompt: String,
    /// Caller-supplied payload, forwarded verbatim to the webhook
    pub content: Value,
    pub webhook_url: String,
    pub status: JobStatus,
    pub phase: PollPhase,
    pub start_time: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Consecutive poll errors since the last successful poll
    pub consecutive_failures: u32,
    /// Result payload, only kept when result retention is enabled
    pub result: Option<String>,
}

impl JobRecord {
    pub fn new(
        job_id: impl Into<String>,
        prompt: impl Into<String>,
        content: Value,
        webhook_url: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            prompt: prompt.into(),
            content,
            webhook_url: webhook_url.into(),
            status: JobStatus::Processing,
            phase: PollPhase::Pending,
            start_time: Utc::now(),
            completed_at: None,
            consecutive_failures: 0,
            result: None,
        }
    }

    /// Move to a terminal status. Only `Processing` jobs can transition;
    /// returns whether the status changed.
    pub fn transition(&mut self, to: JobStatus) -> bool {
        if self.status.is_terminal() || !to.is_terminal() {
            return false;
        }
        self.status = to;
        self.completed_at = Some(Utc::now());
        true
    }
}
