//! Dashboard: owner of the current wizard session
//!
//! Every "new job" starts a fresh session on Upload. Leaving for the mapping
//! editor keeps the session; coming back with a saved mapping hands it to
//! the session.

use scrubr_common::api::MappingId;
use tracing::{debug, info};

use super::session::WizardSession;
use super::WizardContext;

pub struct Dashboard {
    context: WizardContext,
    session: Option<WizardSession>,
    in_mapping_editor: bool,
}

impl Dashboard {
    pub fn new(context: WizardContext) -> Self {
        Self {
            context,
            session: None,
            in_mapping_editor: false,
        }
    }

    /// Start a new job: always a brand-new session on the Upload step
    pub fn start_new_job(&mut self) -> &mut WizardSession {
        let session = WizardSession::new(self.context.clone());
        info!(session_id = %session.session_id(), "New sanitization job started");
        self.in_mapping_editor = false;
        self.session.insert(session)
    }

    pub fn session(&self) -> Option<&WizardSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut WizardSession> {
        self.session.as_mut()
    }

    /// Leave the wizard; the session and its monitor are dropped
    pub fn return_to_dashboard(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(session_id = %session.session_id(), "Wizard session discarded");
        }
        self.in_mapping_editor = false;
    }

    pub fn open_mapping_editor(&mut self) {
        self.in_mapping_editor = true;
    }

    pub fn is_in_mapping_editor(&self) -> bool {
        self.in_mapping_editor
    }

    /// Back from the mapping editor, optionally with a saved mapping
    ///
    /// Returns whether the session jumped to ConfigureMapping.
    pub async fn return_from_mapping_editor(&mut self, saved: Option<MappingId>) -> bool {
        self.in_mapping_editor = false;

        match (saved, self.session.as_mut()) {
            (Some(mapping_id), Some(session)) => session.resume_with_mapping(mapping_id).await,
            _ => false,
        }
    }
}
