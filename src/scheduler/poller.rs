//! Poll scheduler driving each job to a terminal state
//!
//! Every job gets its own tokio task. The task polls the remote service,
//! sleeps according to the [`RetryPolicy`], and exits on a terminal remote
//! status, on failure-cap exhaustion, or when the job disappears from the
//! registry.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{GenerationClient, PollStatus};
use crate::config::Settings;
use crate::delivery::CallbackDispatcher;
use crate::jobs::{JobRegistry, PollPhase};
use crate::scheduler::expiry::ExpirySweeper;
use crate::scheduler::retry::{NextPoll, RetryPolicy};

/// Everything a poll task needs, shared between tasks
struct PollContext {
    client: Arc<dyn GenerationClient>,
    registry: Arc<JobRegistry>,
    dispatcher: Arc<CallbackDispatcher>,
    sweeper: Arc<ExpirySweeper>,
    policy: RetryPolicy,
}

/// Scheduler owning one polling task per active job
pub struct PollScheduler {
    ctx: Arc<PollContext>,
    tasks: Arc<DashMap<String, JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        registry: Arc<JobRegistry>,
        dispatcher: Arc<CallbackDispatcher>,
        sweeper: Arc<ExpirySweeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            ctx: Arc::new(PollContext {
                client,
                registry,
                dispatcher,
                sweeper,
                policy,
            }),
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Build a scheduler whose retry policy comes from settings
    pub fn from_settings(
        settings: &Settings,
        client: Arc<dyn GenerationClient>,
        registry: Arc<JobRegistry>,
        dispatcher: Arc<CallbackDispatcher>,
        sweeper: Arc<ExpirySweeper>,
    ) -> Self {
        Self::new(
            client,
            registry,
            dispatcher,
            sweeper,
            RetryPolicy::from_settings(settings),
        )
    }

    /// Start polling a registered job. The first poll is issued immediately.
    pub fn start(&self, job_id: &str) {
        let ctx = self.ctx.clone();
        let tasks = self.tasks.clone();
        let id = job_id.to_string();
        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            // Wait until the handle is tracked so the cleanup below cannot run first.
            let _ = ready_rx.await;
            let outcome = ctx.run(&id).await;
            debug!(job_id = %id, outcome = ?outcome, "Polling stopped");
            tasks.remove(&id);
        });

        self.tasks.insert(job_id.to_string(), handle);
        let _ = ready_tx.send(());
    }

    /// Number of jobs still being polled
    pub fn active_jobs(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_polling(&self, job_id: &str) -> bool {
        self.tasks.contains_key(job_id)
    }

    /// Abort every polling task
    pub fn shutdown(&self) {
        let count = self.tasks.len();
        self.tasks.retain(|_, handle| {
            handle.abort();
            false
        });
        info!(aborted = count, "Stopped poll scheduler");
    }
}

impl PollContext {
    /// Drive a job until polling stops. Returns the final phase, or `None`
    /// if the job left the registry while being polled.
    async fn run(&self, job_id: &str) -> Option<PollPhase> {
        if !self.registry.set_phase(job_id, PollPhase::Polling) {
            return None;
        }

        loop {
            let job = self.registry.get(job_id)?;
            if job.phase.is_terminal() || job.status.is_terminal() {
                return Some(job.phase);
            }

            let next = match self.client.poll_status(job_id).await {
                Ok(PollStatus::Processing) => {
                    debug!(job_id = %job_id, "Job still processing");
                    self.registry.reset_failures(job_id);
                    self.policy.after_pending()
                }
                Ok(PollStatus::Done(result)) => {
                    info!(job_id = %job_id, "Generation complete");
                    self.complete(job_id, result).await;
                    return Some(PollPhase::Completed);
                }
                Ok(PollStatus::Failed { reason }) => {
                    warn!(job_id = %job_id, reason = %reason, "Remote service reported failure");
                    if self.registry.mark_failed(job_id) {
                        self.sweeper.arm(job_id);
                    }
                    return Some(PollPhase::FailedTerminal);
                }
                Err(e) => {
                    let failures = self.registry.record_poll_failure(job_id)?;
                    warn!(
                        job_id = %job_id,
                        failures = failures,
                        error = %e,
                        "Error checking job status"
                    );
                    self.policy.after_failure(failures)
                }
            };

            match next {
                NextPoll::After(delay) => tokio::time::sleep(delay).await,
                NextPoll::GiveUp => {
                    self.abandon(job_id);
                    return Some(PollPhase::FailedTerminal);
                }
            }
        }
    }

    async fn complete(&self, job_id: &str, result: String) {
        let Some(job) = self.registry.begin_completion(job_id) else {
            return;
        };
        self.dispatcher.deliver(&job, result).await;
        self.sweeper.arm(job_id);
    }

    fn abandon(&self, job_id: &str) {
        warn!(
            job_id = %job_id,
            max_failures = self.policy.max_failures,
            "Giving up on job after consecutive poll failures"
        );

        if self.policy.mark_failed_on_exhaustion {
            if self.registry.mark_failed(job_id) {
                self.sweeper.arm(job_id);
            }
        } else {
            self.registry.mark_abandoned(job_id);
        }
    }
}
