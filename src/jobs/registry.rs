//! In-memory job registry
//!
//! The registry is the only owner of [`JobRecord`]s. Other components read
//! snapshots through [`JobRegistry::get`] and change records through
//! [`JobRegistry::update`], whose closure runs under the shard lock holding
//! the record, so read-modify-write sequences on one job never interleave.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::jobs::record::{JobRecord, JobStatus, PollPhase};

/// Registry of tracked jobs keyed by remote job identifier
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<String, JobRecord>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job. Fails if the identifier is already present.
    pub fn create(&self, record: JobRecord) -> Result<()> {
        match self.jobs.entry(record.job_id.clone()) {
            Entry::Occupied(entry) => Err(AppError::DuplicateJob(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(job_id = %record.job_id, "Registered job");
                entry.insert(record);
                Ok(())
            }
        }
    }

    /// Snapshot of a job, if present
    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.get(job_id).map(|job| job.clone())
    }

    /// Apply a mutation atomically. Returns `None` if the job is absent.
    ///
    /// The closure must not call back into the registry.
    pub fn update<F, R>(&self, job_id: &str, mutation: F) -> Option<R>
    where
        F: FnOnce(&mut JobRecord) -> R,
    {
        self.jobs.get_mut(job_id).map(|mut job| mutation(job.value_mut()))
    }

    pub fn remove(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.remove(job_id).map(|(_, job)| job)
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Count a failed poll, returning the new consecutive failure count
    pub fn record_poll_failure(&self, job_id: &str) -> Option<u32> {
        self.update(job_id, |job| {
            job.consecutive_failures += 1;
            job.consecutive_failures
        })
    }

    /// Clear the failure counter after a successful poll
    pub fn reset_failures(&self, job_id: &str) -> bool {
        self.update(job_id, |job| job.consecutive_failures = 0).is_some()
    }

    pub fn set_phase(&self, job_id: &str, phase: PollPhase) -> bool {
        self.update(job_id, |job| job.phase = phase).is_some()
    }

    /// Claim the completion of a job. At most one caller ever receives the
    /// snapshot; later calls and calls for terminal jobs get `None`.
    pub fn begin_completion(&self, job_id: &str) -> Option<JobRecord> {
        self.update(job_id, |job| {
            if job.phase.is_terminal() || job.status.is_terminal() {
                return None;
            }
            job.phase = PollPhase::Completed;
            job.consecutive_failures = 0;
            Some(job.clone())
        })
        .flatten()
    }

    /// Mark a job completed, optionally keeping its result payload
    pub fn mark_completed(&self, job_id: &str, result: Option<String>) -> bool {
        self.update(job_id, |job| {
            let changed = job.transition(JobStatus::Completed);
            if changed {
                job.result = result;
            }
            changed
        })
        .unwrap_or(false)
    }

    pub fn mark_failed(&self, job_id: &str) -> bool {
        self.update(job_id, |job| {
            let changed = job.transition(JobStatus::Failed);
            if changed {
                job.phase = PollPhase::FailedTerminal;
            }
            changed
        })
        .unwrap_or(false)
    }

    /// Stop polling a job without changing its visible status
    pub fn mark_abandoned(&self, job_id: &str) -> bool {
        self.set_phase(job_id, PollPhase::FailedTerminal)
    }
}
