//! Callback dispatcher for completed jobs

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::jobs::{JobRecord, JobRegistry};

const COMPLETED_MARKER: &str = "completed";

/// JSON body posted to a job's webhook
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload<'a> {
    pub job_id: &'a str,
    pub content: &'a Value,
    pub prompt: &'a str,
    pub status: &'static str,
    pub image_data: &'a str,
}

impl<'a> CallbackPayload<'a> {
    pub fn new(job: &'a JobRecord, image_data: &'a str) -> Self {
        Self {
            job_id: &job.job_id,
            content: &job.content,
            prompt: &job.prompt,
            status: COMPLETED_MARKER,
            image_data,
        }
    }
}

/// Delivers results to caller webhooks.
///
/// Each job gets a single delivery attempt. A failed attempt is logged and
/// the job is still marked completed.
pub struct CallbackDispatcher {
    client: Client,
    registry: Arc<JobRegistry>,
    retain_result: bool,
}

impl CallbackDispatcher {
    pub fn new(registry: Arc<JobRegistry>, timeout: Duration, retain_result: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            registry,
            retain_result,
        })
    }

    pub fn from_settings(settings: &Settings, registry: Arc<JobRegistry>) -> Result<Self> {
        Self::new(
            registry,
            Duration::from_millis(settings.callback.timeout_ms),
            settings.callback.retain_result,
        )
    }

    /// Post the result to the job's webhook, then mark the job completed.
    /// Returns whether the webhook accepted the delivery.
    pub async fn deliver(&self, job: &JobRecord, result: String) -> bool {
        let delivered = match self.post(job, &result).await {
            Ok(()) => {
                info!(job_id = %job.job_id, webhook = %job.webhook_url, "Webhook called");
                true
            }
            Err(e) => {
                error!(
                    job_id = %job.job_id,
                    webhook = %job.webhook_url,
                    error = %e,
                    "Webhook delivery failed"
                );
                false
            }
        };

        let retained = self.retain_result.then_some(result);
        self.registry.mark_completed(&job.job_id, retained);

        delivered
    }

    async fn post(&self, job: &JobRecord, result: &str) -> Result<()> {
        let response = self
            .client
            .post(&job.webhook_url)
            .json(&CallbackPayload::new(job, result))
            .send()
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Delivery(format!("Webhook returned {}", status)));
        }
        Ok(())
    }
}
