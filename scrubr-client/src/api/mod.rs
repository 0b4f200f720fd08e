//! Backend API seam
//!
//! Every orchestration component holds an `Arc<dyn SanitizerApi>` and an
//! `Arc<dyn ProgressChannel>`; the HTTP/SSE implementations live in
//! [`http`] and [`sse`], tests substitute in-memory fakes.

pub mod http;
pub mod sse;

use async_trait::async_trait;
use scrubr_common::api::{
    BrowseRequest, CreateJobRequest, CreateJobResponse, DirectoryListing, FileEntry, JobId,
    JobStatusResponse, MappingSummary, UploadResponse,
};
use std::path::PathBuf;

use crate::error::ClientResult;

pub use http::HttpApi;
pub use sse::{ChannelEvent, ProgressChannel, SseProgressChannel, Subscription};

/// Handle to a local file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Display name sent to the backend
    pub name: String,
    pub path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { name, path }
    }

    /// File picked in the remote browser (same machine as the backend)
    pub fn from_entry(entry: &FileEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path: PathBuf::from(&entry.path),
        }
    }
}

/// Remote operations offered by the sanitization backend
#[async_trait]
pub trait SanitizerApi: Send + Sync {
    /// Upload local files; partial acceptance is reported in `errors`
    async fn upload(&self, files: &[LocalFile]) -> ClientResult<UploadResponse>;

    /// List a remote directory
    async fn browse(&self, request: &BrowseRequest) -> ClientResult<DirectoryListing>;

    /// Start a sanitization job
    async fn create_job(&self, request: &CreateJobRequest) -> ClientResult<CreateJobResponse>;

    /// Request cancellation of a job
    async fn cancel_job(&self, job_id: &JobId) -> ClientResult<()>;

    /// Poll job status
    async fn job_status(&self, job_id: &JobId) -> ClientResult<JobStatusResponse>;

    /// Saved redaction mappings
    async fn list_mappings(&self) -> ClientResult<Vec<MappingSummary>>;
}
