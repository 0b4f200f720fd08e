//! Upload orchestration
//!
//! Turns local file handles into `UploadedFileRecord`s through the backend,
//! tracking in-flight and error state for the upload step.

use scrubr_common::api::UploadResponse;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{LocalFile, SanitizerApi};
use crate::error::{ClientResult, ValidationError};

/// Holds the in-flight flag up for as long as it lives
///
/// Lowers it again even if the upload future is dropped mid-call.
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Upload step controller
pub struct UploadOrchestrator {
    api: Arc<dyn SanitizerApi>,
    in_flight: bool,
    error: Option<String>,
}

impl UploadOrchestrator {
    pub fn new(api: Arc<dyn SanitizerApi>) -> Self {
        Self {
            api,
            in_flight: false,
            error: None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Last user-facing upload error
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Upload `files`
    ///
    /// An empty selection is rejected locally. Rejected files are reported
    /// in the outcome's `errors` and in [`Self::error`] without failing the call.
    pub async fn upload(&mut self, files: Vec<LocalFile>) -> ClientResult<UploadResponse> {
        if files.is_empty() {
            let err = ValidationError::EmptySelection;
            self.error = Some(err.to_string());
            return Err(err.into());
        }

        self.error = None;
        let result = {
            let _in_flight = InFlight::raise(&mut self.in_flight);
            self.api.upload(&files).await
        };

        match result {
            Ok(response) => {
                info!(
                    accepted = response.files.len(),
                    rejected = response.errors.len(),
                    "Upload finished"
                );

                if !response.errors.is_empty() {
                    self.error = Some(response.errors.join("; "));
                } else if response.files.is_empty() {
                    self.error = Some("No files were accepted.".to_string());
                }
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Upload failed");
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}
