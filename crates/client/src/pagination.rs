//! Page arithmetic for list views.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Fixed page size of every list endpoint.
pub const PAGE_SIZE: NonZeroU32 = NonZeroU32::MIN.saturating_add(9);

/// `ceil(total_count / page_size)`.
pub fn compute_pages(total_count: u64, page_size: NonZeroU32) -> u64 {
    total_count.div_ceil(u64::from(page_size.get()))
}

/// Pages are 1-based; anything below 1 is a caller error.
pub fn validate_page(page: i64) -> Result<u32, ClientError> {
    if page < 1 {
        return Err(ClientError::InvalidPage(page));
    }
    u32::try_from(page).map_err(|_| ClientError::InvalidPage(page))
}

/// One entry of the page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page: u32,
    pub active: bool,
}

/// Pagination controls derived from a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total_count: u64, current: u32) -> Self {
        Self {
            current: current.max(1),
            total_count,
            total_pages: compute_pages(total_count, PAGE_SIZE),
        }
    }

    /// Controls are hidden entirely (not just disabled) for a single page.
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }

    /// Every page as a navigation target; empty when controls are hidden.
    pub fn links(&self) -> Vec<PageLink> {
        if !self.is_visible() {
            return Vec::new();
        }
        (1..=self.total_pages)
            .filter_map(|p| u32::try_from(p).ok())
            .map(|page| PageLink {
                page,
                active: page == self.current,
            })
            .collect()
    }

    pub fn previous(&self) -> Option<u32> {
        (self.current > 1).then(|| self.current - 1)
    }

    pub fn next(&self) -> Option<u32> {
        (u64::from(self.current) < self.total_pages).then(|| self.current + 1)
    }
}
