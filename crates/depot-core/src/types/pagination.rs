//! Pagination types for job queries.

use serde::{Deserialize, Serialize};

/// Maximum number of items a single page may request.
const MAX_LIMIT: u64 = 500;

/// Offset/limit window for paginated queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items to skip.
    pub offset: u64,
    /// Maximum number of items to return.
    pub limit: u64,
}

impl PageRequest {
    /// Create a new page request; the limit is clamped to a sane bound.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 25,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T: Serialize> {
    /// The items in this window.
    pub items: Vec<T>,
    /// The offset the window started at.
    pub offset: u64,
    /// Total number of items matching the query, ignoring the window.
    pub total: u64,
}

impl<T: Serialize> PageResponse<T> {
    /// Create a new paginated response.
    pub fn new(items: Vec<T>, offset: u64, total: u64) -> Self {
        Self {
            items,
            offset,
            total,
        }
    }

    /// Create an empty response.
    pub fn empty(offset: u64) -> Self {
        Self {
            items: Vec::new(),
            offset,
            total: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest::new(0, 0).limit, 1);
        assert_eq!(PageRequest::new(0, 10_000).limit, MAX_LIMIT);
        assert_eq!(PageRequest::new(10, 50).limit, 50);
    }
}
