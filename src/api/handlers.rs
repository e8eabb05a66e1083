//! HTTP handlers for job submission and status queries

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::backend::SubmitRequest;
use crate::error::{AppError, Result};
use crate::jobs::{JobRecord, JobStatus};
use crate::AppState;

/// Body of `POST /generate-image`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Opaque payload echoed back in the webhook call
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub num_images: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageResponse {
    pub success: bool,
    pub message: String,
    pub job_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub prompt: String,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl From<JobRecord> for JobStatusResponse {
    fn from(job: JobRecord) -> Self {
        Self {
            job_id: job.job_id,
            status: job.status,
            prompt: job.prompt,
            start_time: job.start_time,
            completed_at: job.completed_at,
            image_data: job.result,
        }
    }
}

/// Start an image generation job and begin polling it in the background
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<GenerateImageRequest>, JsonRejection>,
) -> Result<Json<GenerateImageResponse>> {
    let body = match payload {
        Ok(Json(body)) => body,
        // A body without a JSON content type reads as an empty request.
        Err(JsonRejection::MissingJsonContentType(_)) => GenerateImageRequest::default(),
        Err(rejection) => return Err(AppError::InvalidRequest(rejection.body_text())),
    };

    let (prompt, webhook_url) = match (body.prompt, body.webhook_url) {
        (Some(prompt), Some(url)) if !prompt.is_empty() && !url.is_empty() => (prompt, url),
        _ => {
            return Err(AppError::InvalidRequest(
                "Missing prompt or webhookUrl".to_string(),
            ))
        }
    };

    if reqwest::Url::parse(&webhook_url).is_err() {
        return Err(AppError::InvalidRequest(format!(
            "webhookUrl '{}' is not an absolute URL",
            webhook_url
        )));
    }

    let defaults = &state.settings.generation;
    let request = SubmitRequest {
        prompt: prompt.clone(),
        width: body.width.unwrap_or(defaults.width),
        height: body.height.unwrap_or(defaults.height),
        num_images: body.num_images.unwrap_or(defaults.num_images),
    };

    let job_id = state.client.submit(&request).await.map_err(|e| {
        error!(error = %e, backend = %state.client.name(), "Failed to start generation");
        match e {
            AppError::Submission { .. } => e,
            other => AppError::submission(other.to_string()),
        }
    })?;

    state
        .registry
        .create(JobRecord::new(job_id.clone(), prompt, body.content, webhook_url))?;
    state.scheduler.start(&job_id);

    info!(job_id = %job_id, "Image generation started");

    Ok(Json(GenerateImageResponse {
        success: true,
        message: "Image generation started".to_string(),
        job_id,
    }))
}

/// Report the current state of a job
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>> {
    let job = state
        .registry
        .get(&job_id)
        .ok_or(AppError::JobNotFound(job_id))?;

    debug!(job_id = %job.job_id, status = job.status.as_str(), "Job status requested");
    Ok(Json(job.into()))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "jobs": state.registry.len(),
        "activePolls": state.scheduler.active_jobs(),
    }))
}
