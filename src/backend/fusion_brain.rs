//! HTTP client for the Fusion Brain pipeline API

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::traits::{GenerationClient, PollStatus, SubmitRequest};
use crate::config::RemoteConfig;
use crate::error::{AppError, Result};

const STATUS_DONE: &str = "DONE";
const STATUS_FAIL: &str = "FAIL";

/// Pipeline API client authenticated with static key/secret headers
pub struct FusionBrainClient {
    client: Client,
    base_url: String,
}

/// `params` part of a pipeline run request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunParams<'a> {
    r#type: &'static str,
    num_images: u32,
    width: u32,
    height: u32,
    generate_params: GenerateParams<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateParams<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    result: Option<StatusResult>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    #[serde(default)]
    files: Vec<String>,
}

impl FusionBrainClient {
    /// Create a new client from configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Key", header_value(&format!("Key {}", config.api_key))?);
        headers.insert(
            "X-Secret",
            header_value(&format!("Secret {}", config.api_secret))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        AppError::Config(config::ConfigError::Message(
            "Remote credentials contain invalid header characters".to_string(),
        ))
    })
}

/// Read a response body as JSON, keeping the raw text when it is not JSON
async fn body_json(response: Response) -> Result<Value> {
    let text = response
        .text()
        .await
        .map_err(|e| AppError::submission(format!("Failed to read response body: {}", e)))?;
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[async_trait]
impl GenerationClient for FusionBrainClient {
    fn name(&self) -> &str {
        "fusion-brain"
    }

    async fn fetch_pipeline_id(&self) -> Result<String> {
        let response = self
            .client
            .get(self.url("/pipelines"))
            .send()
            .await
            .map_err(|e| AppError::submission(format!("Failed to list pipelines: {}", e)))?;

        let status = response.status();
        let body = body_json(response).await?;
        if !status.is_success() {
            return Err(AppError::Submission {
                message: format!("Pipeline listing returned {}", status),
                details: Some(body),
            });
        }

        // Only the first listed pipeline is considered.
        let id = body
            .as_array()
            .and_then(|pipelines| pipelines.first())
            .and_then(|pipeline| pipeline.get("id"))
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| AppError::Submission {
                message: "Remote service returned no usable pipeline".to_string(),
                details: Some(body.clone()),
            })?;

        debug!(pipeline_id = %id, "Resolved pipeline");
        Ok(id)
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<String> {
        let pipeline_id = self.fetch_pipeline_id().await?;

        let params = serde_json::to_string(&RunParams {
            r#type: "GENERATE",
            num_images: request.num_images,
            width: request.width,
            height: request.height,
            generate_params: GenerateParams {
                query: &request.prompt,
            },
        })?;

        let params_part = Part::text(params)
            .mime_str("application/json")
            .map_err(|e| AppError::submission(format!("Failed to encode request: {}", e)))?;
        let form = Form::new()
            .part("params", params_part)
            .text("pipeline_id", pipeline_id.clone());

        let response = self
            .client
            .post(self.url("/pipeline/run"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::submission(format!("Failed to reach remote service: {}", e)))?;

        let status = response.status();
        let body = body_json(response).await?;

        let job_id = body.get("uuid").and_then(Value::as_str).map(str::to_string);
        match job_id {
            Some(job_id) if status.is_success() => {
                info!(job_id = %job_id, pipeline_id = %pipeline_id, "Remote service accepted job");
                Ok(job_id)
            }
            _ => Err(AppError::Submission {
                message: format!("Remote service did not return a job identifier ({})", status),
                details: Some(body),
            }),
        }
    }

    async fn poll_status(&self, job_id: &str) -> Result<PollStatus> {
        let response = self
            .client
            .get(self.url(&format!("/pipeline/status/{}", job_id)))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AppError::Poll(format!("Failed to reach remote service: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Poll(format!("Status endpoint returned {}", status)));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::Poll(format!("Failed to parse status response: {}", e)))?;

        debug!(job_id = %job_id, status = %body.status, "Polled remote status");

        match body.status.as_str() {
            STATUS_DONE => body
                .result
                .and_then(|result| result.files.into_iter().next())
                .map(PollStatus::Done)
                .ok_or_else(|| AppError::Poll("Job finished without any result file".to_string())),
            STATUS_FAIL => Ok(PollStatus::Failed {
                reason: body
                    .error_description
                    .unwrap_or_else(|| "remote generation failed".to_string()),
            }),
            _ => Ok(PollStatus::Processing),
        }
    }
}
