//! Retry policy for status polling

use std::time::Duration;

use crate::config::Settings;

/// What the scheduler should do after a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPoll {
    /// Poll again after the given delay
    After(Duration),
    /// Stop polling the job
    GiveUp,
}

/// Fixed-rate polling with a capped number of consecutive transport failures.
///
/// "Still processing" answers never count against the cap and never grow the
/// interval; only failed polls do, and those wait `failure_backoff` instead.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    pub failure_backoff: Duration,
    pub max_failures: u32,
    /// Whether a job that hits the cap becomes `failed` rather than staying `processing`
    pub mark_failed_on_exhaustion: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            failure_backoff: Duration::from_secs(10),
            max_failures: 5,
            mark_failed_on_exhaustion: false,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            failure_backoff: settings.failure_backoff(),
            max_failures: settings.polling.max_failures,
            mark_failed_on_exhaustion: settings.polling.mark_failed_on_exhaustion,
        }
    }

    /// Next step after the remote service reported the job still running
    pub fn after_pending(&self) -> NextPoll {
        NextPoll::After(self.poll_interval)
    }

    /// Next step after a failed poll, given the updated consecutive failure count
    pub fn after_failure(&self, consecutive_failures: u32) -> NextPoll {
        if consecutive_failures >= self.max_failures {
            NextPoll::GiveUp
        } else {
            NextPoll::After(self.failure_backoff)
        }
    }
}
