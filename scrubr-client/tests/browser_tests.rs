//! Directory Navigation Tests
//! Test File: browser_tests.rs
//! Covers stale-response discard, selection reset, the show-all toggle and
//! last-directory persistence.

mod helpers;

use helpers::{entry, listing, network_error, FailingStore, FakeApi};
use scrubr_client::error::{ClientError, ValidationError};
use scrubr_client::services::{DirectoryNavigator, LAST_DIRECTORY_KEY};
use scrubr_client::store::{KeyValueStore, MemoryStore};
use scrubr_common::api::DirectoryListing;
use std::sync::Arc;

fn create_navigator(api: &Arc<FakeApi>, store: &Arc<MemoryStore>) -> DirectoryNavigator {
    DirectoryNavigator::new(api.clone(), store.clone(), None)
}

/// TC-NAV-001: Responses to superseded requests are discarded
#[tokio::test]
async fn tc_nav_001_stale_response_discarded() {
    // Given: Two navigations issued back to back
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    let mut navigator = create_navigator(&api, &store);
    let first = navigator.begin_navigation(Some("/a".to_string()));
    let second = navigator.begin_navigation(Some("/b".to_string()));

    // When: The older response arrives first
    assert!(!navigator.complete_navigation(first.clone(), Ok(listing("/a", &[], &["a.csv"]))));

    // Then: Nothing applied, still loading
    assert!(navigator.current_path().is_none());
    assert!(navigator.is_loading());

    // Newest applies; a late copy of the older one is still ignored
    assert!(navigator.complete_navigation(second, Ok(listing("/b", &[], &["b.csv"]))));
    assert!(!navigator.complete_navigation(first, Ok(listing("/a", &[], &["a.csv"]))));
    assert_eq!(navigator.current_path(), Some("/b"));
    assert_eq!(navigator.files()[0].name, "b.csv");
    assert!(!navigator.is_loading());
    assert_eq!(store.get(LAST_DIRECTORY_KEY).unwrap().as_deref(), Some("/b"));
}

/// TC-NAV-002: Every navigation clears the selection
#[tokio::test]
async fn tc_nav_002_navigation_clears_selection() {
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    let mut navigator = create_navigator(&api, &store);
    navigator.navigate_to(Some("/home/user".to_string())).await;

    let file = navigator.files()[0].clone();
    navigator.select_file(&file).unwrap();
    assert_eq!(navigator.selected_file(), Some(&file));

    // Cleared as soon as a navigation begins
    let ticket = navigator.begin_navigation(Some("/home/user".to_string()));
    assert!(navigator.selected_file().is_none());
    navigator.complete_navigation(ticket, Ok(listing("/home/user", &["docs"], &["data.csv"])));
    assert!(navigator.selected_file().is_none());

    // Also across refresh and directory changes
    navigator.select_file(&file).unwrap();
    navigator.refresh().await;
    assert!(navigator.selected_file().is_none());

    navigator.select_file(&file).unwrap();
    let docs = navigator.directories()[0].clone();
    navigator.enter_directory(&docs).await.unwrap();
    assert!(navigator.selected_file().is_none());
    assert_eq!(navigator.current_path(), Some("/home/user/docs"));
}

/// TC-NAV-003: Toggling show-all re-lists the same directory with the new filter
/// and drops the previous selection
#[tokio::test]
async fn tc_nav_003_toggle_show_all_relists() {
    // Given: A file selected at /home/user
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    let mut navigator = create_navigator(&api, &store);
    navigator.navigate_to(Some("/home/user".to_string())).await;
    assert!(!api.last_browse().unwrap().show_all);
    let file = navigator.files()[0].clone();
    navigator.select_file(&file).unwrap();
    assert_eq!(navigator.selected_file(), Some(&file));

    // When: Show-all is toggled
    navigator.toggle_show_all().await;

    // Then: Same directory re-listed unfiltered, selection not carried over
    let request = api.last_browse().unwrap();
    assert_eq!(request.path.as_deref(), Some("/home/user"));
    assert!(request.show_all);
    assert!(navigator.show_all());
    assert_eq!(api.browse_count(), 2);
    assert!(navigator.selected_file().is_none());
    assert!(navigator.files().iter().any(|f| f.path == file.path));

    // Toggling back also starts from an empty selection
    navigator.select_file(&file).unwrap();
    navigator.toggle_show_all().await;
    assert!(!api.last_browse().unwrap().show_all);
    assert!(navigator.selected_file().is_none());
}

/// TC-NAV-004: Last directory persists and seeds the next navigator
#[tokio::test]
async fn tc_nav_004_last_directory_persisted() {
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    let mut navigator = create_navigator(&api, &store);

    // Server default resolves to the home directory
    navigator.load().await;
    assert_eq!(api.last_browse().unwrap().path, None);
    assert_eq!(store.get(LAST_DIRECTORY_KEY).unwrap().as_deref(), Some("/home/user"));

    navigator.navigate_to(Some("/srv/data".to_string())).await;

    // Next navigator starts from the persisted path
    let mut next = create_navigator(&api, &store);
    assert_eq!(next.initial_path(), Some("/srv/data"));
    next.load().await;
    assert_eq!(api.last_browse().unwrap().path.as_deref(), Some("/srv/data"));

    // An explicit path wins over the persisted one
    let explicit = DirectoryNavigator::new(api.clone(), store.clone(), Some("/tmp".to_string()));
    assert_eq!(explicit.initial_path(), Some("/tmp"));
}

/// TC-NAV-005: Store failures never break navigation
#[tokio::test]
async fn tc_nav_005_store_failure_swallowed() {
    let api = FakeApi::new();
    let mut navigator = DirectoryNavigator::new(api.clone(), Arc::new(FailingStore), None);
    assert!(navigator.initial_path().is_none());

    navigator.navigate_to(Some("/home/user".to_string())).await;

    assert_eq!(navigator.current_path(), Some("/home/user"));
    assert!(navigator.error().is_none());
    assert_eq!(navigator.files().len(), 1);
}

/// TC-NAV-006: Up without a parent is a no-op
#[tokio::test]
async fn tc_nav_006_navigate_up_without_parent() {
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    let mut navigator = create_navigator(&api, &store);

    assert!(!navigator.navigate_up().await);
    assert_eq!(api.browse_count(), 0);

    navigator.navigate_to(Some("/".to_string())).await;
    assert!(navigator.parent_path().is_none());
    assert!(!navigator.navigate_up().await);
    assert_eq!(api.browse_count(), 1);

    navigator.navigate_to(Some("/home/user".to_string())).await;
    assert!(navigator.navigate_up().await);
    assert_eq!(navigator.current_path(), Some("/home"));
}

/// TC-NAV-007: Listing errors clear the entries and are not persisted
#[tokio::test]
async fn tc_nav_007_listing_error() {
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    api.on_browse(|request| {
        let path = request.path.clone().unwrap_or_default();
        if path == "/root" {
            Ok(DirectoryListing {
                current_path: path,
                parent_path: Some("/".to_string()),
                error: Some("Permission denied".to_string()),
                ..Default::default()
            })
        } else {
            Ok(listing(&path, &["x"], &["y.csv"]))
        }
    });
    let mut navigator = create_navigator(&api, &store);
    navigator.navigate_to(Some("/srv".to_string())).await;

    navigator.navigate_to(Some("/root".to_string())).await;

    assert_eq!(navigator.error(), Some("Permission denied"));
    assert!(navigator.directories().is_empty());
    assert!(navigator.files().is_empty());
    assert_eq!(navigator.current_path(), Some("/root"));
    assert_eq!(store.get(LAST_DIRECTORY_KEY).unwrap().as_deref(), Some("/srv"));

    // Next successful listing clears the error
    navigator.navigate_up().await;
    assert!(navigator.error().is_none());
}

/// TC-NAV-008: Transport failure shows a generic message
#[tokio::test]
async fn tc_nav_008_browse_failure() {
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    api.on_browse(|_| Err(network_error()));
    let mut navigator = create_navigator(&api, &store);

    navigator.navigate_to(Some("/home/user".to_string())).await;

    assert!(navigator.error().unwrap().contains("Could not reach"));
    assert!(navigator.files().is_empty());
    assert!(!navigator.is_loading());
}

/// TC-NAV-009: Only entries of the current listing can be selected or entered
#[tokio::test]
async fn tc_nav_009_foreign_entries_rejected() {
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    let mut navigator = create_navigator(&api, &store);
    navigator.navigate_to(Some("/home/user".to_string())).await;

    let stranger = entry("/elsewhere", "other.csv", false);
    assert_eq!(
        navigator.select_file(&stranger),
        Err(ValidationError::NotInListing("/elsewhere/other.csv".to_string()))
    );

    let dir = entry("/elsewhere", "dir", true);
    let result = navigator.enter_directory(&dir).await;
    assert!(matches!(
        result,
        Err(ClientError::Validation(ValidationError::NotInListing(_)))
    ));
    assert_eq!(api.browse_count(), 1);
}

/// TC-NAV-010: Display paging, directories first
#[tokio::test]
async fn tc_nav_010_paging() {
    let api = FakeApi::new();
    let store = Arc::new(MemoryStore::new());
    let dirs: Vec<String> = (0..30).map(|i| format!("d{:03}", i)).collect();
    let files: Vec<String> = (0..120).map(|i| format!("f{:03}.csv", i)).collect();
    api.on_browse(move |_| {
        let dirs: Vec<&str> = dirs.iter().map(String::as_str).collect();
        let files: Vec<&str> = files.iter().map(String::as_str).collect();
        Ok(listing("/big", &dirs, &files))
    });
    let mut navigator = create_navigator(&api, &store);
    navigator.load().await;

    let first = navigator.page(1);
    assert_eq!(first.pagination.total_pages, 2);
    assert_eq!(first.entries.len(), 100);
    assert_eq!(first.entries[0].name, "d000");
    assert_eq!(first.entries[30].name, "f000.csv");

    let second = navigator.page(2);
    assert_eq!(second.entries.len(), 50);
    assert_eq!(second.entries[49].name, "f119.csv");

    // Out of range clamps to the last page
    assert_eq!(navigator.page(9).pagination.page, 2);
}
