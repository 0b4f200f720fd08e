//! Remote directory navigation
//!
//! Tracks the current listing of the backend's file system along with a
//! single-file selection, and remembers the last visited directory in the
//! durable store.
//!
//! **Initial path:** explicit caller path, else the persisted last directory,
//! else none (the server picks its default, usually the home directory).

use scrubr_common::api::{BrowseRequest, DirectoryListing, FileEntry};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::SanitizerApi;
use crate::error::{ClientResult, ValidationError};
use crate::pagination::{calculate_pagination, Pagination};
use crate::store::KeyValueStore;

/// Store key holding the last successfully listed directory
pub const LAST_DIRECTORY_KEY: &str = "file_browser.last_directory";

/// An issued browse request
///
/// Only the most recently issued ticket may update the navigator.
#[derive(Debug, Clone)]
pub struct NavigationTicket {
    seq: u64,
    request: BrowseRequest,
}

impl NavigationTicket {
    pub fn request(&self) -> &BrowseRequest {
        &self.request
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// One display page of the listing, directories first
#[derive(Debug)]
pub struct ListingPage<'a> {
    pub pagination: Pagination,
    pub entries: Vec<&'a FileEntry>,
}

/// Navigation controller for the remote file browser
pub struct DirectoryNavigator {
    api: Arc<dyn SanitizerApi>,
    store: Arc<dyn KeyValueStore>,
    initial_path: Option<String>,

    current_path: Option<String>,
    parent_path: Option<String>,
    directories: Vec<FileEntry>,
    files: Vec<FileEntry>,
    /// Index into `files`; reset on every navigation
    selected: Option<usize>,

    show_all: bool,
    loading: bool,
    error: Option<String>,

    issued_seq: u64,
}

impl DirectoryNavigator {
    /// Create a navigator; the store is read exactly once, here
    pub fn new(
        api: Arc<dyn SanitizerApi>,
        store: Arc<dyn KeyValueStore>,
        explicit_path: Option<String>,
    ) -> Self {
        let persisted = match store.get(LAST_DIRECTORY_KEY) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Last directory unavailable");
                None
            }
        };

        let initial_path = explicit_path
            .filter(|p| !p.trim().is_empty())
            .or(persisted.filter(|p| !p.trim().is_empty()));

        Self {
            api,
            store,
            initial_path,
            current_path: None,
            parent_path: None,
            directories: Vec::new(),
            files: Vec::new(),
            selected: None,
            show_all: false,
            loading: false,
            error: None,
            issued_seq: 0,
        }
    }

    /// Start with the "include unsupported file types" filter set
    pub fn with_show_all(mut self, show_all: bool) -> Self {
        self.show_all = show_all;
        self
    }

    // ========================================
    // Accessors
    // ========================================

    /// Path the first `load` will request
    pub fn initial_path(&self) -> Option<&str> {
        self.initial_path.as_deref()
    }

    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    pub fn parent_path(&self) -> Option<&str> {
        self.parent_path.as_deref()
    }

    pub fn directories(&self) -> &[FileEntry] {
        &self.directories
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn selected_file(&self) -> Option<&FileEntry> {
        self.selected.and_then(|i| self.files.get(i))
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // ========================================
    // Navigation
    // ========================================

    /// Initial listing using the resolved initial path
    pub async fn load(&mut self) {
        let path = self.initial_path.clone();
        self.navigate_to(path).await;
    }

    /// Replace the listing with that of `path` (`None` = server default)
    pub async fn navigate_to(&mut self, path: Option<String>) {
        let ticket = self.begin_navigation(path);
        let result = self.api.browse(ticket.request()).await;
        self.complete_navigation(ticket, result);
    }

    /// Go to the parent directory; no-op when none is known
    ///
    /// Returns whether a navigation was issued.
    pub async fn navigate_up(&mut self) -> bool {
        match self.parent_path.clone() {
            Some(parent) => {
                self.navigate_to(Some(parent)).await;
                true
            }
            None => false,
        }
    }

    /// Navigate into a directory entry of the current listing
    pub async fn enter_directory(&mut self, entry: &FileEntry) -> ClientResult<()> {
        let known = entry.is_directory && self.directories.iter().any(|d| d.path == entry.path);
        if !known {
            return Err(ValidationError::NotInListing(entry.path.clone()).into());
        }
        self.navigate_to(Some(entry.path.clone())).await;
        Ok(())
    }

    /// Re-issue the current listing
    pub async fn refresh(&mut self) {
        let path = self.current_path.clone().or_else(|| self.initial_path.clone());
        self.navigate_to(path).await;
    }

    /// Flip the "include unsupported file types" filter and re-list
    pub async fn toggle_show_all(&mut self) {
        self.show_all = !self.show_all;
        debug!(show_all = self.show_all, "Toggled file filter");
        self.refresh().await;
    }

    /// Start a navigation: clears the selection and marks loading
    ///
    /// The returned ticket's request carries the filter value as of now.
    pub fn begin_navigation(&mut self, path: Option<String>) -> NavigationTicket {
        self.issued_seq += 1;
        self.loading = true;
        self.selected = None;

        NavigationTicket {
            seq: self.issued_seq,
            request: BrowseRequest {
                path,
                show_all: self.show_all,
            },
        }
    }

    /// Apply the outcome of a navigation
    ///
    /// Responses to anything but the newest ticket are discarded. Returns
    /// whether the result was applied.
    pub fn complete_navigation(
        &mut self,
        ticket: NavigationTicket,
        result: ClientResult<DirectoryListing>,
    ) -> bool {
        if ticket.seq != self.issued_seq {
            debug!(
                stale = ticket.seq,
                newest = self.issued_seq,
                "Discarding superseded directory listing"
            );
            return false;
        }

        self.loading = false;
        self.selected = None;

        match result {
            Ok(listing) => {
                self.current_path = Some(listing.current_path);
                self.parent_path = listing.parent_path;

                match listing.error {
                    Some(error) => {
                        warn!(path = ?self.current_path, error = %error, "Directory listing failed");
                        self.directories.clear();
                        self.files.clear();
                        self.error = Some(error);
                    }
                    None => {
                        self.directories = listing.directories;
                        self.files = listing.files;
                        self.error = None;
                        if let Some(path) = self.current_path.clone() {
                            self.persist_last_directory(&path);
                        }
                        info!(
                            path = ?self.current_path,
                            directories = self.directories.len(),
                            files = self.files.len(),
                            "Directory listed"
                        );
                    }
                }
            }
            Err(e) => {
                warn!(path = ?ticket.request.path, error = %e, "Browse request failed");
                self.directories.clear();
                self.files.clear();
                self.error = Some(e.user_message());
            }
        }

        true
    }

    // ========================================
    // Selection
    // ========================================

    /// Select a file of the current listing (local only)
    pub fn select_file(&mut self, entry: &FileEntry) -> Result<(), ValidationError> {
        let index = self
            .files
            .iter()
            .position(|f| f.path == entry.path && !f.is_directory)
            .ok_or_else(|| ValidationError::NotInListing(entry.path.clone()))?;
        self.selected = Some(index);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    // ========================================
    // Display paging
    // ========================================

    /// Directories then files, 100 per page
    pub fn page(&self, requested_page: usize) -> ListingPage<'_> {
        let total = self.directories.len() + self.files.len();
        let pagination = calculate_pagination(total, requested_page);
        let range = pagination.range(total);

        let entries = self
            .directories
            .iter()
            .chain(self.files.iter())
            .skip(range.start)
            .take(range.len())
            .collect();

        ListingPage {
            pagination,
            entries,
        }
    }

    fn persist_last_directory(&self, path: &str) {
        if let Err(e) = self.store.set(LAST_DIRECTORY_KEY, path) {
            debug!(error = %e, "Could not persist last directory");
        }
    }
}
