//! Test Helper Utilities
//!
//! In-memory stand-ins for the sanitization backend, the push channel and
//! the durable store.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;
use scrubr_common::api::{
    BrowseRequest, CreateJobRequest, CreateJobResponse, DirectoryListing, FileEntry, JobId,
    JobProgressSnapshot, JobStatus, JobStatusResponse, MappingId, MappingSummary,
    UploadResponse, UploadedFileRecord,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scrubr_client::api::{ChannelEvent, LocalFile, ProgressChannel, SanitizerApi, Subscription};
use scrubr_client::error::{ClientError, ClientResult};
use scrubr_client::store::KeyValueStore;

type Handler<Req, Resp> = Box<dyn FnMut(&Req) -> ClientResult<Resp> + Send>;

/// Scriptable backend
///
/// Every operation records its request and answers through a replaceable
/// handler. Defaults describe a healthy backend.
pub struct FakeApi {
    upload_handler: Mutex<Handler<Vec<LocalFile>, UploadResponse>>,
    browse_handler: Mutex<Handler<BrowseRequest, DirectoryListing>>,
    create_job_handler: Mutex<Handler<CreateJobRequest, CreateJobResponse>>,
    cancel_handler: Mutex<Handler<JobId, ()>>,
    status_handler: Mutex<Handler<JobId, JobStatusResponse>>,

    pub uploads: Mutex<Vec<Vec<LocalFile>>>,
    pub browse_requests: Mutex<Vec<BrowseRequest>>,
    pub create_job_requests: Mutex<Vec<CreateJobRequest>>,
    pub cancelled: Mutex<Vec<JobId>>,
    pub status_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            upload_handler: Mutex::new(Box::new(|files: &Vec<LocalFile>| {
                Ok(UploadResponse {
                    files: files.iter().map(|f| uploaded(&f.name)).collect(),
                    errors: Vec::new(),
                })
            })),
            browse_handler: Mutex::new(Box::new(|request: &BrowseRequest| {
                let path = request.path.clone().unwrap_or_else(|| "/home/user".to_string());
                Ok(listing(&path, &["docs"], &["data.csv"]))
            })),
            create_job_handler: Mutex::new(Box::new(|request: &CreateJobRequest| {
                Ok(CreateJobResponse {
                    job_id: JobId::from("job-1"),
                    output_path: format!("{}/sanitized.csv", request.output_dir),
                    status: JobStatus::Pending,
                })
            })),
            cancel_handler: Mutex::new(Box::new(|_: &JobId| Ok(()))),
            status_handler: Mutex::new(Box::new(|job_id: &JobId| {
                Ok(status(job_id.as_str(), JobStatus::Running, 10))
            })),
            uploads: Mutex::new(Vec::new()),
            browse_requests: Mutex::new(Vec::new()),
            create_job_requests: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        })
    }

    pub fn on_upload(
        &self,
        f: impl FnMut(&Vec<LocalFile>) -> ClientResult<UploadResponse> + Send + 'static,
    ) {
        *self.upload_handler.lock().unwrap() = Box::new(f);
    }

    pub fn on_browse(
        &self,
        f: impl FnMut(&BrowseRequest) -> ClientResult<DirectoryListing> + Send + 'static,
    ) {
        *self.browse_handler.lock().unwrap() = Box::new(f);
    }

    pub fn on_create_job(
        &self,
        f: impl FnMut(&CreateJobRequest) -> ClientResult<CreateJobResponse> + Send + 'static,
    ) {
        *self.create_job_handler.lock().unwrap() = Box::new(f);
    }

    pub fn on_cancel(&self, f: impl FnMut(&JobId) -> ClientResult<()> + Send + 'static) {
        *self.cancel_handler.lock().unwrap() = Box::new(f);
    }

    pub fn on_status(
        &self,
        f: impl FnMut(&JobId) -> ClientResult<JobStatusResponse> + Send + 'static,
    ) {
        *self.status_handler.lock().unwrap() = Box::new(f);
    }

    pub fn create_job_count(&self) -> usize {
        self.create_job_requests.lock().unwrap().len()
    }

    pub fn browse_count(&self) -> usize {
        self.browse_requests.lock().unwrap().len()
    }

    pub fn last_browse(&self) -> Option<BrowseRequest> {
        self.browse_requests.lock().unwrap().last().cloned()
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SanitizerApi for FakeApi {
    async fn upload(&self, files: &[LocalFile]) -> ClientResult<UploadResponse> {
        let files = files.to_vec();
        self.uploads.lock().unwrap().push(files.clone());
        let mut handler = self.upload_handler.lock().unwrap();
        (*handler)(&files)
    }

    async fn browse(&self, request: &BrowseRequest) -> ClientResult<DirectoryListing> {
        self.browse_requests.lock().unwrap().push(request.clone());
        let mut handler = self.browse_handler.lock().unwrap();
        (*handler)(request)
    }

    async fn create_job(&self, request: &CreateJobRequest) -> ClientResult<CreateJobResponse> {
        self.create_job_requests.lock().unwrap().push(request.clone());
        let mut handler = self.create_job_handler.lock().unwrap();
        (*handler)(request)
    }

    async fn cancel_job(&self, job_id: &JobId) -> ClientResult<()> {
        self.cancelled.lock().unwrap().push(job_id.clone());
        let mut handler = self.cancel_handler.lock().unwrap();
        (*handler)(job_id)
    }

    async fn job_status(&self, job_id: &JobId) -> ClientResult<JobStatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut handler = self.status_handler.lock().unwrap();
        (*handler)(job_id)
    }

    async fn list_mappings(&self) -> ClientResult<Vec<MappingSummary>> {
        Ok(vec![MappingSummary {
            id: MappingId::from("customers"),
            name: "Customer PII".to_string(),
            field_count: 4,
        }])
    }
}

/// Push channel driven by the test
///
/// Each `subscribe` opens a fresh subscription whose sender is kept so the
/// test can feed events or check whether the monitor dropped it.
#[derive(Default)]
pub struct FakeChannel {
    senders: Mutex<Vec<UnboundedSender<ChannelEvent>>>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscription_count(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    /// Send on the most recent subscription; false if it is closed
    pub fn send(&self, event: ChannelEvent) -> bool {
        let senders = self.senders.lock().unwrap();
        match senders.last() {
            Some(tx) => tx.unbounded_send(event).is_ok(),
            None => false,
        }
    }

    pub fn open(&self) -> bool {
        self.send(ChannelEvent::Opened)
    }

    pub fn push(&self, snapshot: &JobProgressSnapshot) -> bool {
        self.send(ChannelEvent::Message(
            serde_json::to_string(snapshot).unwrap(),
        ))
    }

    /// Server-side close of the most recent subscription
    pub fn close(&self) {
        if let Some(tx) = self.senders.lock().unwrap().last() {
            tx.close_channel();
        }
    }

    /// Whether the subscriber dropped the most recent subscription
    pub fn is_closed(&self) -> bool {
        self.senders
            .lock()
            .unwrap()
            .last()
            .map_or(true, |tx| tx.is_closed())
    }

    /// Whether the subscriber dropped the `index`-th subscription (0-based)
    pub fn is_closed_at(&self, index: usize) -> bool {
        self.senders
            .lock()
            .unwrap()
            .get(index)
            .map_or(true, |tx| tx.is_closed())
    }
}

impl ProgressChannel for FakeChannel {
    fn subscribe(&self, _job_id: &JobId) -> Subscription {
        let (tx, rx) = unbounded();
        self.senders.lock().unwrap().push(tx);
        rx.boxed()
    }
}

/// Store whose every operation fails
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> ClientResult<Option<String>> {
        Err(ClientError::Store("store unavailable".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> ClientResult<()> {
        Err(ClientError::Store("store unavailable".to_string()))
    }
}

// ========================================
// Builders
// ========================================

pub fn uploaded(name: &str) -> UploadedFileRecord {
    UploadedFileRecord {
        name: name.to_string(),
        path: format!("/uploads/{}", name),
        size: 1024,
        format: Some("csv".to_string()),
    }
}

pub fn entry(parent: &str, name: &str, is_directory: bool) -> FileEntry {
    FileEntry {
        name: name.to_string(),
        path: format!("{}/{}", parent.trim_end_matches('/'), name),
        size: if is_directory { None } else { Some(2048) },
        modified_at: None,
        is_directory,
        is_readable: true,
        format: if is_directory { None } else { Some("csv".to_string()) },
    }
}

pub fn listing(path: &str, directories: &[&str], files: &[&str]) -> DirectoryListing {
    DirectoryListing {
        current_path: path.to_string(),
        parent_path: Path::new(path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned()),
        directories: directories.iter().map(|d| entry(path, d, true)).collect(),
        files: files.iter().map(|f| entry(path, f, false)).collect(),
        error: None,
    }
}

pub fn snapshot(job_id: &str, status: JobStatus, processed: u64) -> JobProgressSnapshot {
    JobProgressSnapshot {
        job_id: JobId::from(job_id),
        status,
        records_processed: processed,
        total_records: Some(100),
        percent_complete: Some(processed as f64),
        elapsed_seconds: 1.0,
        records_sanitized: None,
        error_kind: None,
        message: None,
        output_path: None,
    }
}

pub fn status(job_id: &str, status: JobStatus, processed: u64) -> JobStatusResponse {
    JobStatusResponse {
        job_id: JobId::from(job_id),
        status,
        records_processed: processed,
        total_records: Some(100),
        records_sanitized: None,
        error_kind: None,
        output_path: None,
    }
}

pub fn network_error() -> ClientError {
    ClientError::Network("connection refused".to_string())
}

/// Let spawned tasks run; with paused time this also advances the clock slightly
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
