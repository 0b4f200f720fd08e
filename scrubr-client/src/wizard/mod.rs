//! Sanitization wizard
//!
//! [`Dashboard`] owns at most one [`WizardSession`]; sessions share a
//! [`WizardContext`] holding the backend seams and the event bus.

pub mod dashboard;
pub mod session;
pub mod validation;

use scrubr_common::events::EventBus;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ProgressChannel, SanitizerApi};
use crate::services::DEFAULT_POLL_FAILURE_THRESHOLD;

pub use dashboard::Dashboard;
pub use session::{
    ActiveJob, ProgressOutcome, StepTransition, WizardSession, DEFAULT_COMPLETION_DELAY,
};
pub use validation::validate_output_dir;

/// Tunables for wizard sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardSettings {
    /// Pause on the last Processing view before showing Complete
    pub completion_delay: Duration,
    pub poll_failure_threshold: u32,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            completion_delay: DEFAULT_COMPLETION_DELAY,
            poll_failure_threshold: DEFAULT_POLL_FAILURE_THRESHOLD,
        }
    }
}

/// Collaborators shared by every session
#[derive(Clone)]
pub struct WizardContext {
    pub api: Arc<dyn SanitizerApi>,
    pub channel: Arc<dyn ProgressChannel>,
    pub event_bus: EventBus,
    pub settings: WizardSettings,
}

impl WizardContext {
    pub fn new(api: Arc<dyn SanitizerApi>, channel: Arc<dyn ProgressChannel>) -> Self {
        Self {
            api,
            channel,
            event_bus: EventBus::default(),
            settings: WizardSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: WizardSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }
}
