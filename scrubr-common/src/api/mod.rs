//! Wire types shared with the sanitization backend

pub mod types;

pub use types::{
    BrowseRequest, CreateJobRequest, CreateJobResponse, DirectoryListing, FileEntry, JobErrorKind,
    JobId, JobProgressSnapshot, JobResult, JobStatus, JobStatusResponse, MappingId,
    MappingSummary, UploadResponse, UploadedFileRecord,
};
