//! reqwest implementation of [`SanitizerApi`]
//!
//! Endpoints:
//! - POST /api/upload (multipart, one `files` part per file)
//! - GET  /api/browse?path=&showAll=
//! - POST /api/jobs
//! - POST /api/jobs/{id}/cancel
//! - GET  /api/jobs/{id}
//! - GET  /api/mappings

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use scrubr_common::api::{
    BrowseRequest, CreateJobRequest, CreateJobResponse, DirectoryListing, JobId,
    JobStatusResponse, MappingSummary, UploadResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::{LocalFile, SanitizerApi};
use crate::error::{ClientError, ClientResult};

const USER_AGENT: &str = concat!("scrubr/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the sanitization backend
#[derive(Debug, Clone)]
pub struct HttpApi {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decode a JSON body, mapping non-success statuses to [`ClientError::Api`]
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            message: error_message_from_body(&body),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))
}

/// Pull a human-readable message out of an error body
///
/// Accepts `{"error": {"message": ..}}`, `{"error": ".."}`, `{"message": ".."}`
/// or plain text.
pub(crate) fn error_message_from_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => {
            let nested = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str());
            let flat = value.get("error").and_then(|e| e.as_str());
            let message = value.get("message").and_then(|m| m.as_str());

            nested
                .or(flat)
                .or(message)
                .map(str::to_string)
                .unwrap_or_default()
        }
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl SanitizerApi for HttpApi {
    async fn upload(&self, files: &[LocalFile]) -> ClientResult<UploadResponse> {
        let mut form = Form::new();
        let mut local_errors = Vec::new();
        let mut parts = 0usize;

        for file in files {
            match tokio::fs::read(&file.path).await {
                Ok(bytes) => {
                    form = form.part("files", Part::bytes(bytes).file_name(file.name.clone()));
                    parts += 1;
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Skipping unreadable file");
                    local_errors.push(format!("{}: {}", file.name, e));
                }
            }
        }

        if parts == 0 {
            return Ok(UploadResponse {
                files: Vec::new(),
                errors: local_errors,
            });
        }

        debug!(files = parts, "Uploading files");

        let response = self
            .http_client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;

        let mut upload: UploadResponse = decode(response).await?;
        upload.errors.extend(local_errors);
        Ok(upload)
    }

    async fn browse(&self, request: &BrowseRequest) -> ClientResult<DirectoryListing> {
        debug!(path = ?request.path, show_all = request.show_all, "Browsing");

        let response = self
            .http_client
            .get(self.url("/api/browse"))
            .query(request)
            .send()
            .await?;

        decode(response).await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> ClientResult<CreateJobResponse> {
        debug!(mapping_id = %request.mapping_id, output_dir = %request.output_dir, "Creating job");

        let response = self
            .http_client
            .post(self.url("/api/jobs"))
            .json(request)
            .send()
            .await?;

        decode(response).await
    }

    async fn cancel_job(&self, job_id: &JobId) -> ClientResult<()> {
        let response = self
            .http_client
            .post(self.url(&format!("/api/jobs/{}/cancel", job_id)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message_from_body(&body),
            });
        }
        Ok(())
    }

    async fn job_status(&self, job_id: &JobId) -> ClientResult<JobStatusResponse> {
        let response = self
            .http_client
            .get(self.url(&format!("/api/jobs/{}", job_id)))
            .send()
            .await?;

        decode(response).await
    }

    async fn list_mappings(&self) -> ClientResult<Vec<MappingSummary>> {
        let response = self
            .http_client
            .get(self.url("/api/mappings"))
            .send()
            .await?;

        decode(response).await
    }
}
