//! Wizard session state machine
//!
//! Steps progress Upload → Review → ConfigureMapping → Processing → Complete,
//! with an error sub-state inside Processing.
//!
//! **Transitions:**
//! - Upload → Review: upload accepted at least one file (rejections still shown)
//! - Review → Upload: cancel, clears the file set
//! - Review → ConfigureMapping: submit
//! - ConfigureMapping → Processing: needs a mapping id and a valid output directory
//! - Processing → ConfigureMapping: stop (best-effort remote cancel) or back from error
//! - Processing → Complete: job completed, after the display delay
//! - any → ConfigureMapping: mapping editor hand-off while files are selected

use chrono::{DateTime, Utc};
use scrubr_common::api::{
    CreateJobRequest, JobId, JobResult, JobStatus, MappingId, MappingSummary, UploadedFileRecord,
};
use scrubr_common::events::{ScrubEvent, WizardStep};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::validation::validate_output_dir;
use super::WizardContext;
use crate::api::LocalFile;
use crate::error::{ClientResult, ValidationError};
use crate::services::{MonitorView, ScanProgressMonitor, UploadOrchestrator};

/// Default pause between observing completion and showing the Complete step
pub const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_millis(1500);

/// Recorded step change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTransition {
    pub from: WizardStep,
    pub to: WizardStep,
    pub at: DateTime<Utc>,
}

/// Job accepted by the backend for the current Processing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJob {
    pub job_id: JobId,
    pub output_path: String,
}

/// What a monitor update meant for the wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// Job still pending or running
    InProgress,
    /// Job completed; Complete follows after the display delay
    Completed(JobResult),
    /// Job failed; the session is in the error sub-state
    Failed(String),
    /// Not processing, or a terminal state was already acted on
    Ignored,
}

/// One wizard session
pub struct WizardSession {
    session_id: Uuid,
    created_at: DateTime<Utc>,
    context: WizardContext,

    step: WizardStep,
    transitions: Vec<StepTransition>,

    files: Vec<UploadedFileRecord>,
    uploader: UploadOrchestrator,
    mapping_id: Option<MappingId>,
    output_dir: String,
    /// Inline message for the current step (upload rejections, validation)
    message: Option<String>,

    monitor: ScanProgressMonitor,
    job: Option<ActiveJob>,
    processing_entry: u64,
    /// One-shot: set before the create-job call of the current Processing entry
    job_latch: bool,
    /// Set once a terminal snapshot has been acted on
    completion_latch: bool,
    /// Error sub-state of Processing
    processing_error: Option<String>,
    result: Option<JobResult>,
}

impl WizardSession {
    pub fn new(context: WizardContext) -> Self {
        let monitor = ScanProgressMonitor::new(
            context.api.clone(),
            context.channel.clone(),
        )
        .with_poll_failure_threshold(context.settings.poll_failure_threshold);
        let uploader = UploadOrchestrator::new(context.api.clone());

        let session_id = Uuid::new_v4();
        debug!(session_id = %session_id, "Wizard session created");

        Self {
            session_id,
            created_at: Utc::now(),
            context,
            step: WizardStep::Upload,
            transitions: Vec::new(),
            files: Vec::new(),
            uploader,
            mapping_id: None,
            output_dir: String::new(),
            message: None,
            monitor,
            job: None,
            processing_entry: 0,
            job_latch: false,
            completion_latch: false,
            processing_error: None,
            result: None,
        }
    }

    // ========================================
    // Accessors
    // ========================================

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn transitions(&self) -> &[StepTransition] {
        &self.transitions
    }

    pub fn files(&self) -> &[UploadedFileRecord] {
        &self.files
    }

    pub fn mapping_id(&self) -> Option<&MappingId> {
        self.mapping_id.as_ref()
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploader.is_in_flight()
    }

    pub fn job(&self) -> Option<&ActiveJob> {
        self.job.as_ref()
    }

    /// Processing entries so far (each start or retry is one)
    pub fn processing_entries(&self) -> u64 {
        self.processing_entry
    }

    /// In the error sub-state of Processing
    pub fn is_error(&self) -> bool {
        self.step == WizardStep::Processing && self.processing_error.is_some()
    }

    pub fn processing_error(&self) -> Option<&str> {
        self.processing_error.as_deref()
    }

    pub fn result(&self) -> Option<&JobResult> {
        self.result.as_ref()
    }

    pub fn monitor_view(&self) -> MonitorView {
        self.monitor.view()
    }

    pub fn monitor_updates(&self) -> watch::Receiver<MonitorView> {
        self.monitor.subscribe()
    }

    // ========================================
    // Upload / Review
    // ========================================

    /// Upload files; advances to Review when at least one was accepted
    ///
    /// Rejections and failures land in [`Self::message`]; a failed call
    /// leaves the step unchanged.
    pub async fn upload(&mut self, files: Vec<LocalFile>) -> ClientResult<WizardStep> {
        self.require_step(WizardStep::Upload)?;

        match self.uploader.upload(files).await {
            Ok(response) => {
                self.message = self.uploader.error().map(str::to_string);
                if !response.files.is_empty() {
                    self.files.extend(response.files);
                    self.transition_to(WizardStep::Review)?;
                }
                Ok(self.step)
            }
            Err(e) => {
                self.message = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Remove one uploaded file by path
    pub fn remove_file(&mut self, path: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.path != path);
        self.files.len() != before
    }

    /// Review → Upload, discarding the file set
    pub fn cancel_review(&mut self) -> Result<(), ValidationError> {
        self.require_step(WizardStep::Review)?;
        self.files.clear();
        self.message = None;
        self.uploader.clear_error();
        self.transition_to(WizardStep::Upload)
    }

    /// Review → ConfigureMapping
    pub fn submit_review(&mut self) -> Result<(), ValidationError> {
        self.require_step(WizardStep::Review)?;
        if self.files.is_empty() {
            self.message = Some(ValidationError::EmptySelection.to_string());
            return Err(ValidationError::EmptySelection);
        }
        self.message = None;
        self.transition_to(WizardStep::ConfigureMapping)
    }

    // ========================================
    // ConfigureMapping
    // ========================================

    /// Saved mappings to choose from
    pub async fn available_mappings(&self) -> ClientResult<Vec<MappingSummary>> {
        self.context.api.list_mappings().await
    }

    pub fn set_mapping(&mut self, mapping_id: MappingId) {
        self.mapping_id = Some(mapping_id);
    }

    pub fn set_output_dir(&mut self, output_dir: impl Into<String>) {
        self.output_dir = output_dir.into();
    }

    /// Mapping editor hand-off
    ///
    /// With a non-empty file set the id is injected and the session jumps to
    /// ConfigureMapping from whatever step it was on. Otherwise the id is
    /// only remembered. Returns whether the jump happened.
    pub async fn resume_with_mapping(&mut self, mapping_id: MappingId) -> bool {
        info!(session_id = %self.session_id, mapping_id = %mapping_id, "Mapping returned from editor");
        self.mapping_id = Some(mapping_id);

        if self.files.is_empty() {
            return false;
        }

        if self.step == WizardStep::Processing {
            self.abandon_processing().await;
        }
        self.message = None;
        self.record_transition(WizardStep::ConfigureMapping);
        true
    }

    // ========================================
    // Processing
    // ========================================

    /// ConfigureMapping → Processing, then run the entry logic
    ///
    /// Missing mapping or a bad output directory refuses the transition and
    /// sets an inline message. Returns whether a job was created.
    pub async fn start_processing(&mut self) -> ClientResult<bool> {
        self.require_step(WizardStep::ConfigureMapping)?;

        if let Err(e) = self.check_ready_for_processing() {
            self.message = Some(e.to_string());
            return Err(e.into());
        }

        self.message = None;
        self.transition_to(WizardStep::Processing)?;
        self.processing_entry += 1;
        self.job_latch = false;
        self.completion_latch = false;
        self.processing_error = None;
        self.result = None;
        self.job = None;

        self.run_processing_entry().await
    }

    /// Processing entry logic: create the job and start monitoring it
    ///
    /// Runs at most once per Processing entry; repeated invocations return
    /// `Ok(false)` without contacting the backend. A creation failure puts the
    /// session in the error sub-state; there is no automatic retry.
    pub async fn run_processing_entry(&mut self) -> ClientResult<bool> {
        if self.step != WizardStep::Processing {
            return Ok(false);
        }
        if self.job_latch {
            debug!(
                session_id = %self.session_id,
                entry = self.processing_entry,
                "Job already started for this entry"
            );
            return Ok(false);
        }
        self.job_latch = true;

        let mapping_id = match self.mapping_id.clone() {
            Some(id) => id,
            None => return Err(ValidationError::MissingMapping.into()),
        };

        let request = CreateJobRequest {
            source: self.files.iter().map(|f| f.path.clone()).collect(),
            mapping_id,
            output_dir: self.output_dir.trim().to_string(),
        };

        match self.context.api.create_job(&request).await {
            Ok(response) => {
                info!(
                    session_id = %self.session_id,
                    job_id = %response.job_id,
                    output_path = %response.output_path,
                    "Sanitization job started"
                );
                self.context.event_bus.emit_lossy(ScrubEvent::JobStarted {
                    session_id: self.session_id,
                    job_id: response.job_id.clone(),
                    timestamp: Utc::now(),
                });
                self.monitor.activate(Some(response.job_id.clone()));
                self.job = Some(ActiveJob {
                    job_id: response.job_id,
                    output_path: response.output_path,
                });
                Ok(true)
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Job creation failed");
                let message = e.user_message();
                self.context.event_bus.emit_lossy(ScrubEvent::JobFailed {
                    session_id: self.session_id,
                    job_id: None,
                    error_kind: None,
                    message: message.clone(),
                    timestamp: Utc::now(),
                });
                self.processing_error = Some(message);
                Err(e)
            }
        }
    }

    /// React to a monitor view
    ///
    /// Terminal snapshots are acted on exactly once.
    pub fn observe(&mut self, view: &MonitorView) -> ProgressOutcome {
        if self.step != WizardStep::Processing || self.completion_latch {
            return ProgressOutcome::Ignored;
        }

        let (Some(snapshot), Some(job)) = (view.snapshot.as_ref(), self.job.as_ref()) else {
            return ProgressOutcome::InProgress;
        };

        if snapshot.job_id != job.job_id {
            return ProgressOutcome::Ignored;
        }

        match snapshot.status {
            JobStatus::Pending | JobStatus::Running => ProgressOutcome::InProgress,
            JobStatus::Completed => {
                self.completion_latch = true;
                // Backend-reported location wins over the one announced at creation
                let output_path = snapshot
                    .output_path
                    .clone()
                    .unwrap_or_else(|| job.output_path.clone());
                let result = JobResult {
                    output_path,
                    records_processed: snapshot.records_processed,
                    records_sanitized: snapshot
                        .records_sanitized
                        .unwrap_or(snapshot.records_processed),
                };
                info!(
                    session_id = %self.session_id,
                    job_id = %job.job_id,
                    records = result.records_processed,
                    "Sanitization job completed"
                );
                self.context.event_bus.emit_lossy(ScrubEvent::JobCompleted {
                    session_id: self.session_id,
                    job_id: job.job_id.clone(),
                    result: result.clone(),
                    timestamp: Utc::now(),
                });
                self.result = Some(result.clone());
                ProgressOutcome::Completed(result)
            }
            JobStatus::Failed => {
                self.completion_latch = true;
                let kind = snapshot.error_kind;
                let message = match kind {
                    Some(kind) => kind.user_message().to_string(),
                    None => "The sanitization job failed.".to_string(),
                };
                warn!(
                    session_id = %self.session_id,
                    job_id = %job.job_id,
                    error_kind = ?kind,
                    "Sanitization job failed"
                );
                self.context.event_bus.emit_lossy(ScrubEvent::JobFailed {
                    session_id: self.session_id,
                    job_id: Some(job.job_id.clone()),
                    error_kind: kind,
                    message: message.clone(),
                    timestamp: Utc::now(),
                });
                self.processing_error = Some(message.clone());
                self.monitor.deactivate();
                ProgressOutcome::Failed(message)
            }
        }
    }

    /// Processing → Complete, once completion has been observed
    pub fn finish_completion(&mut self) -> Result<(), ValidationError> {
        self.require_step(WizardStep::Processing)?;
        self.transition_to(WizardStep::Complete)?;
        self.monitor.deactivate();
        Ok(())
    }

    /// Drive Processing from monitor updates until Complete or the error sub-state
    ///
    /// Returns the resulting step. Returns immediately when there is no job
    /// to follow.
    pub async fn wait_for_outcome(&mut self) -> WizardStep {
        let mut updates = self.monitor.subscribe();

        loop {
            if self.step != WizardStep::Processing || self.processing_error.is_some() {
                return self.step;
            }

            if self.completion_latch {
                if self.result.is_some() {
                    tokio::time::sleep(self.context.settings.completion_delay).await;
                    if let Err(e) = self.finish_completion() {
                        warn!(session_id = %self.session_id, error = %e, "Could not complete session");
                    }
                }
                return self.step;
            }

            if self.job.is_none() {
                return self.step;
            }

            let view = updates.borrow_and_update().clone();
            if let ProgressOutcome::InProgress | ProgressOutcome::Ignored = self.observe(&view) {
                if updates.changed().await.is_err() {
                    return self.step;
                }
            }
        }
    }

    /// Processing → ConfigureMapping, cancelling the job
    ///
    /// The remote cancel is best-effort; the step changes regardless.
    pub async fn stop(&mut self) -> Result<(), ValidationError> {
        self.require_step(WizardStep::Processing)?;
        self.abandon_processing().await;
        self.transition_to(WizardStep::ConfigureMapping)
    }

    /// Error sub-state → ConfigureMapping
    pub fn back_from_error(&mut self) -> Result<(), ValidationError> {
        self.require_step(WizardStep::Processing)?;
        self.monitor.deactivate();
        self.job = None;
        self.processing_error = None;
        self.transition_to(WizardStep::ConfigureMapping)
    }

    /// Explicit user retry from the error sub-state (a new Processing entry)
    pub async fn retry(&mut self) -> ClientResult<bool> {
        if !self.is_error() {
            return Err(ValidationError::WrongStep {
                expected: WizardStep::Processing,
                actual: self.step,
            }
            .into());
        }
        self.back_from_error()?;
        self.start_processing().await
    }

    // ========================================
    // Internals
    // ========================================

    /// Tear down the current job: best-effort cancel when still running
    async fn abandon_processing(&mut self) {
        let still_running = !self.monitor.view().is_terminal() && !self.completion_latch;

        if let Some(job) = self.job.take() {
            if still_running {
                if let Err(e) = self.context.api.cancel_job(&job.job_id).await {
                    warn!(job_id = %job.job_id, error = %e, "Cancel request failed, continuing");
                }
                self.context.event_bus.emit_lossy(ScrubEvent::JobStopped {
                    session_id: self.session_id,
                    job_id: job.job_id.clone(),
                    timestamp: Utc::now(),
                });
                info!(session_id = %self.session_id, job_id = %job.job_id, "Job stopped by user");
            }
        }

        self.monitor.deactivate();
        self.processing_error = None;
    }

    fn check_ready_for_processing(&self) -> Result<(), ValidationError> {
        if self.files.is_empty() {
            return Err(ValidationError::EmptySelection);
        }
        if self.mapping_id.is_none() {
            return Err(ValidationError::MissingMapping);
        }
        validate_output_dir(&self.output_dir)
    }

    fn require_step(&self, expected: WizardStep) -> Result<(), ValidationError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(ValidationError::WrongStep {
                expected,
                actual: self.step,
            })
        }
    }

    /// Guarded step change; enforces the Processing and Complete preconditions
    fn transition_to(&mut self, to: WizardStep) -> Result<(), ValidationError> {
        match to {
            WizardStep::Processing => self.check_ready_for_processing()?,
            WizardStep::Complete => {
                if !self.completion_latch || self.result.is_none() {
                    return Err(ValidationError::WrongStep {
                        expected: WizardStep::Complete,
                        actual: self.step,
                    });
                }
            }
            WizardStep::Upload | WizardStep::Review | WizardStep::ConfigureMapping => {}
        }

        self.record_transition(to);
        Ok(())
    }

    fn record_transition(&mut self, to: WizardStep) {
        let from = self.step;
        if from == to {
            return;
        }

        let at = Utc::now();
        self.step = to;
        self.transitions.push(StepTransition { from, to, at });

        info!(
            session_id = %self.session_id,
            from = ?from,
            to = ?to,
            "Wizard step changed"
        );
        self.context.event_bus.emit_lossy(ScrubEvent::StepChanged {
            session_id: self.session_id,
            old_step: from,
            new_step: to,
            timestamp: at,
        });
    }
}
