//! Bounded pagination for list queries.

use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Upper bound on any page size.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A 1-based page request, always within bounds once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build a request from optional query values.
    ///
    /// `page` below 1 becomes 1; `limit` of 0 becomes the default and anything
    /// above `max_limit` is clamped.
    pub fn new(page: Option<u32>, limit: Option<u32>, max_limit: u32) -> Self {
        let max_limit = max_limit.max(1);
        let limit = match limit {
            None | Some(0) => DEFAULT_PAGE_LIMIT.min(max_limit),
            Some(l) => l.min(max_limit),
        };
        Self {
            page: page.unwrap_or(1).max(1),
            limit,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Zero-based row offset.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Slice an in-memory, already ordered collection.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.limit as usize)
            .collect();
        Page {
            items,
            total,
            request: *self,
        }
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        let limit = u64::from(self.request.limit());
        self.total.div_ceil(limit)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}
