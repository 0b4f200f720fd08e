//! Event types and EventBus for the scrubr client
//!
//! Wizard sessions publish their lifecycle here so that presentation layers
//! (or logs) can follow along without holding a reference to the session.

use crate::api::{JobErrorKind, JobId, JobResult};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Steps of the sanitization wizard, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardStep {
    /// Choose and upload source files
    Upload = 1,
    /// Review the uploaded file set
    Review = 2,
    /// Pick a redaction mapping and output directory
    ConfigureMapping = 3,
    /// Job running, progress monitored
    Processing = 4,
    /// Job finished, result available
    Complete = 5,
}

impl WizardStep {
    /// 1-based position in the sequence
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// scrubr event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScrubEvent {
    /// Wizard moved between steps
    StepChanged {
        session_id: Uuid,
        old_step: WizardStep,
        new_step: WizardStep,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Backend accepted a sanitization job
    JobStarted {
        session_id: Uuid,
        job_id: JobId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Job reached `completed`
    JobCompleted {
        session_id: Uuid,
        job_id: JobId,
        result: JobResult,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Job creation failed or the job reached `failed`
    JobFailed {
        session_id: Uuid,
        job_id: Option<JobId>,
        error_kind: Option<JobErrorKind>,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// User stopped a running job
    JobStopped {
        session_id: Uuid,
        job_id: JobId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ScrubEvent {
    /// Event name for logs and SSE framing
    pub fn event_type(&self) -> &'static str {
        match self {
            ScrubEvent::StepChanged { .. } => "StepChanged",
            ScrubEvent::JobStarted { .. } => "JobStarted",
            ScrubEvent::JobCompleted { .. } => "JobCompleted",
            ScrubEvent::JobFailed { .. } => "JobFailed",
            ScrubEvent::JobStopped { .. } => "JobStopped",
        }
    }
}

/// Broadcast bus for ScrubEvents
///
/// Cloning shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ScrubEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Lagging subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ScrubEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ScrubEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
