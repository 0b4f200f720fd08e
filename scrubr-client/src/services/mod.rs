//! Orchestration services used by the wizard

pub mod browser;
pub mod monitor;
pub mod uploader;

pub use browser::{DirectoryNavigator, ListingPage, NavigationTicket, LAST_DIRECTORY_KEY};
pub use monitor::{
    ApplyOutcome, MonitorState, MonitorView, ScanProgressMonitor, CONNECT_TIMEOUT,
    DEFAULT_POLL_FAILURE_THRESHOLD, POLL_INTERVAL, STALE_PROGRESS_NOTICE,
};
pub use uploader::UploadOrchestrator;
