//! Request/response types for the sanitization backend
//!
//! All payloads use camelCase JSON field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ========================================
// Identifiers
// ========================================

/// Opaque identifier of a backend sanitization job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Opaque reference to a saved set of per-field redaction rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingId(pub String);

impl MappingId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MappingId {
    fn from(s: &str) -> Self {
        MappingId(s.to_string())
    }
}

// ========================================
// Job status
// ========================================

/// Sanitization job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never change status again
    pub fn is_terminal(self) -> bool {
        match self {
            JobStatus::Completed | JobStatus::Failed => true,
            JobStatus::Pending | JobStatus::Running => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Classification of a remote job failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobErrorKind {
    FileNotFound,
    PermissionDenied,
    InvalidFormat,
    MappingNotFound,
    OutputNotWritable,
    DiskFull,
    Cancelled,
    Internal,
    /// Any kind this client does not recognize
    #[serde(other)]
    Unknown,
}

impl JobErrorKind {
    /// User-readable explanation of the failure
    pub fn user_message(self) -> &'static str {
        match self {
            JobErrorKind::FileNotFound => {
                "A source file could not be found. It may have been moved or deleted."
            }
            JobErrorKind::PermissionDenied => {
                "Permission denied while reading a source file."
            }
            JobErrorKind::InvalidFormat => {
                "A source file is not in a supported format or is corrupted."
            }
            JobErrorKind::MappingNotFound => {
                "The selected field mapping no longer exists. Choose another mapping."
            }
            JobErrorKind::OutputNotWritable => {
                "The output directory is not writable. Choose a different location."
            }
            JobErrorKind::DiskFull => "The output disk is full.",
            JobErrorKind::Cancelled => "The job was cancelled.",
            JobErrorKind::Internal => "The sanitization engine hit an internal error.",
            JobErrorKind::Unknown => "The sanitization job failed.",
        }
    }
}

/// One point-in-time progress report for a running job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub records_processed: u64,
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub percent_complete: Option<f64>,
    #[serde(default)]
    pub elapsed_seconds: f64,
    #[serde(default)]
    pub records_sanitized: Option<u64>,
    #[serde(default)]
    pub error_kind: Option<JobErrorKind>,
    /// Free-form detail from the engine, if any
    #[serde(default)]
    pub message: Option<String>,
    /// Where the sanitized output was written, once the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

impl JobProgressSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// GET /api/jobs/{id} response
///
/// Coarser than a pushed snapshot: no elapsed time, no percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub records_processed: u64,
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub records_sanitized: Option<u64>,
    #[serde(default)]
    pub error_kind: Option<JobErrorKind>,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl JobStatusResponse {
    /// Translate a polled status into a snapshot
    ///
    /// `elapsed_seconds` is measured locally by the caller. Percentage is
    /// derived from the counts when the total is known.
    pub fn into_snapshot(self, elapsed_seconds: f64) -> JobProgressSnapshot {
        let percent_complete = match self.total_records {
            Some(total) if total > 0 => {
                Some((self.records_processed as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        };

        JobProgressSnapshot {
            job_id: self.job_id,
            status: self.status,
            records_processed: self.records_processed,
            total_records: self.total_records,
            percent_complete,
            elapsed_seconds,
            records_sanitized: self.records_sanitized,
            error_kind: self.error_kind,
            message: None,
            output_path: self.output_path,
        }
    }
}

// ========================================
// Uploads
// ========================================

/// A file accepted by the backend upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileRecord {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub format: Option<String>,
}

/// POST /api/upload response
///
/// Partial success is normal: accepted files and per-file rejections coexist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub files: Vec<UploadedFileRecord>,
    #[serde(default)]
    pub errors: Vec<String>,
}

// ========================================
// Directory browsing
// ========================================

/// One entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default = "default_true")]
    pub is_readable: bool,
    #[serde(default)]
    pub format: Option<String>,
}

fn default_true() -> bool {
    true
}

/// GET /api/browse query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub show_all: bool,
}

/// GET /api/browse response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub current_path: String,
    #[serde(default)]
    pub parent_path: Option<String>,
    #[serde(default)]
    pub directories: Vec<FileEntry>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

// ========================================
// Jobs and mappings
// ========================================

/// POST /api/jobs request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    /// Paths of the uploaded file set, in selection order
    pub source: Vec<String>,
    pub mapping_id: MappingId,
    pub output_dir: String,
}

/// POST /api/jobs response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: JobId,
    pub output_path: String,
    pub status: JobStatus,
}

/// GET /api/mappings entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSummary {
    pub id: MappingId,
    pub name: String,
    #[serde(default)]
    pub field_count: usize,
}

/// Handed to the completion step once a job completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub output_path: String,
    pub records_processed: u64,
    pub records_sanitized: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_snapshot_parses_camel_case_payload() {
        let payload = json!({
            "jobId": "job-1",
            "status": "running",
            "recordsProcessed": 40,
            "totalRecords": 100,
            "percentComplete": 40.0,
            "elapsedSeconds": 3.5
        });

        let snapshot: JobProgressSnapshot = serde_json::from_value(payload).unwrap();
        assert_eq!(snapshot.job_id, JobId::from("job-1"));
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.records_processed, 40);
        assert_eq!(snapshot.total_records, Some(100));
        assert!(snapshot.error_kind.is_none());
    }

    #[test]
    fn test_snapshot_rejects_unknown_status() {
        let payload = json!({"jobId": "job-1", "status": "exploded"});
        assert!(serde_json::from_value::<JobProgressSnapshot>(payload).is_err());
    }

    #[test]
    fn test_unrecognized_error_kind_maps_to_unknown() {
        let payload = json!({"jobId": "j", "status": "failed", "errorKind": "cosmicRay"});
        let snapshot: JobProgressSnapshot = serde_json::from_value(payload).unwrap();
        assert_eq!(snapshot.error_kind, Some(JobErrorKind::Unknown));
        assert_eq!(
            JobErrorKind::Unknown.user_message(),
            "The sanitization job failed."
        );
    }

    #[test]
    fn test_polled_status_derives_percentage() {
        let status = JobStatusResponse {
            job_id: JobId::from("j"),
            status: JobStatus::Running,
            records_processed: 25,
            total_records: Some(200),
            records_sanitized: None,
            error_kind: None,
            output_path: None,
        };

        let snapshot = status.into_snapshot(7.0);
        assert_eq!(snapshot.percent_complete, Some(12.5));
        assert_eq!(snapshot.elapsed_seconds, 7.0);
        assert!(snapshot.output_path.is_none());
    }

    #[test]
    fn test_polled_status_carries_output_path() {
        let payload = json!({
            "jobId": "j",
            "status": "completed",
            "recordsProcessed": 10,
            "totalRecords": 10,
            "outputPath": "/srv/out/customers.sanitized.csv"
        });
        let status: JobStatusResponse = serde_json::from_value(payload).unwrap();

        let snapshot = status.into_snapshot(2.0);
        assert_eq!(
            snapshot.output_path.as_deref(),
            Some("/srv/out/customers.sanitized.csv")
        );
        assert_eq!(snapshot.percent_complete, Some(100.0));
    }

    #[test]
    fn test_polled_status_without_total_has_no_percentage() {
        let status = JobStatusResponse {
            job_id: JobId::from("j"),
            status: JobStatus::Pending,
            records_processed: 0,
            total_records: Some(0),
            records_sanitized: None,
            error_kind: None,
            output_path: None,
        };

        assert!(status.into_snapshot(0.0).percent_complete.is_none());
    }

    #[test]
    fn test_browse_request_omits_missing_path() {
        let value = serde_json::to_value(BrowseRequest {
            path: None,
            show_all: true,
        })
        .unwrap();
        assert_eq!(value, json!({"showAll": true}));
    }

    #[test]
    fn test_file_entry_defaults_readable() {
        let entry: FileEntry =
            serde_json::from_value(json!({"name": "a.csv", "path": "/d/a.csv"})).unwrap();
        assert!(entry.is_readable);
        assert!(!entry.is_directory);
    }
}
