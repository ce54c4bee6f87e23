//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Page size used when bulk-loading weekly plan lines
pub const DEFAULT_PLAN_PAGE_SIZE: usize = 5000;

/// Offset-based page window, matching the datastore's inclusive `range(from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Inclusive row range covered by this page
    pub fn range(&self) -> (usize, usize) {
        (self.offset, self.offset + self.limit.saturating_sub(1))
    }

    pub fn next(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }

    /// A page shorter than the requested size means the source is exhausted
    pub fn is_last(&self, returned: usize) -> bool {
        returned < self.limit
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PLAN_PAGE_SIZE)
    }
}
