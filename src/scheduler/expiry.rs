//! Per-job expiry of finished records

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::jobs::JobRegistry;

/// Removes finished jobs from the registry once their retention window ends.
///
/// Each job arms its own one-shot timer when it finishes; there is no global sweep.
pub struct ExpirySweeper {
    registry: Arc<JobRegistry>,
    retention: Duration,
}

impl ExpirySweeper {
    pub fn new(registry: Arc<JobRegistry>, retention: Duration) -> Self {
        Self {
            registry,
            retention,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Schedule removal of `job_id` one retention window from now
    pub fn arm(&self, job_id: &str) {
        let registry = self.registry.clone();
        let retention = self.retention;
        let job_id = job_id.to_string();

        debug!(job_id = %job_id, retention_secs = retention.as_secs(), "Armed job expiry");

        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            if registry.remove(&job_id).is_some() {
                debug!(job_id = %job_id, "Expired job record");
            }
        });
    }
}
