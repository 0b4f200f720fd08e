//! Pagination utilities for directory listings
//!
//! Listings are displayed 100 entries per page.

/// Page size constant for listing pages
pub const PAGE_SIZE: usize = 100;

/// Pagination metadata calculated from total entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    /// Total number of pages (at least 1, even when empty)
    pub total_pages: usize,
    /// Index of the first entry on the page
    pub offset: usize,
}

impl Pagination {
    /// Index range of the page within a slice of `total` entries
    pub fn range(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.offset.min(total);
        let end = (self.offset + PAGE_SIZE).min(total);
        start..end
    }
}

/// Calculate pagination metadata from total entries and requested page
///
/// Ensures page is within valid bounds [1, total_pages].
///
/// # Examples
/// ```
/// use scrubr_client::pagination::calculate_pagination;
///
/// // 250 entries = 3 pages (100 + 100 + 50)
/// let p = calculate_pagination(250, 2);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 100);
///
/// // Out-of-bounds page gets clamped
/// let p = calculate_pagination(250, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 200);
/// ```
pub fn calculate_pagination(total_entries: usize, requested_page: usize) -> Pagination {
    let total_pages = total_entries.div_ceil(PAGE_SIZE).max(1);
    let page = requested_page.clamp(1, total_pages);
    let offset = (page - 1) * PAGE_SIZE;

    Pagination {
        page,
        total_pages,
        offset,
    }
}
