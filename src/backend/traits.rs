//! Common traits and types for remote generation services

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request to start an image generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// The prompt to generate images from
    pub prompt: String,

    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Number of images to generate
    pub num_images: u32,
}

/// Result of a single status poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// The remote job has not finished yet
    Processing,

    /// The remote job finished; carries the encoded result (first result file)
    Done(String),

    /// The remote service reported that the job itself failed
    Failed { reason: String },
}

/// Client for a remote image generation service.
///
/// Implementations perform exactly one outbound call per operation. Retry
/// policy belongs to the poll scheduler, not to the client.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Get the client name, used in logs
    fn name(&self) -> &str;

    /// Resolve the pipeline to target. The first listed pipeline is used.
    async fn fetch_pipeline_id(&self) -> Result<String>;

    /// Submit a generation job, returning the identifier assigned by the remote service
    async fn submit(&self, request: &SubmitRequest) -> Result<String>;

    /// Query the status of a previously submitted job
    async fn poll_status(&self, job_id: &str) -> Result<PollStatus>;
}
