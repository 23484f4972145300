//! Offset pagination for the post listing.

use crate::domain::error::DomainError;

/// Posts shown per listing page.
pub const PAGE_SIZE: u64 = 5;

/// Page links shown before the current page.
const WINDOW_BEFORE: u64 = 3;
/// Page links shown from the current page onward (exclusive bound).
const WINDOW_AFTER: u64 = 4;

/// Parse a zero-based page number taken from the URL path.
pub fn parse_page_number(raw: &str) -> Result<u64, DomainError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::invalid_page(raw));
    }
    raw.parse().map_err(|_| DomainError::invalid_page(raw))
}

/// Everything a listing page needs to draw its pager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub total: u64,
    pub total_pages: u64,
    pub last_page: u64,
    /// Zero-based page numbers to link, in ascending order.
    pub window: Vec<u64>,
}

impl Pagination {
    pub fn new(page: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(PAGE_SIZE);
        let last_page = total_pages.saturating_sub(1);
        let start = page.saturating_sub(WINDOW_BEFORE);
        let end = total_pages.min(page.saturating_add(WINDOW_AFTER));
        let window = (start..end).collect();

        Self {
            page,
            total,
            total_pages,
            last_page,
            window,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(PAGE_SIZE)
    }

    pub fn limit(&self) -> u64 {
        PAGE_SIZE
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page < self.last_page
    }

    pub fn previous_page(&self) -> Option<u64> {
        self.has_previous().then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<u64> {
        self.has_next().then(|| self.page + 1)
    }
}
