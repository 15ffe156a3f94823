//! Shared pagination utilities
//!
//! List endpoints answer with
//! `{"data": [...], "meta": {"pagination": {page, pageSize, pageCount, total}}}`.

use serde::{Deserialize, Serialize};

/// Pagination metadata for a list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub page: u32,

    /// Items per page
    pub page_size: u32,

    /// Total number of pages, `ceil(total / page_size)`
    pub page_count: i64,

    /// Total number of matching items
    pub total: i64,
}

impl PaginationMeta {
    pub fn new(page: u32, page_size: u32, total: i64) -> Self {
        let page_count = if total <= 0 || page_size == 0 {
            0
        } else {
            (total + i64::from(page_size) - 1) / i64::from(page_size)
        };

        Self {
            page,
            page_size,
            page_count,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub pagination: PaginationMeta,
}

/// Envelope for paginated list responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub meta: ResponseMeta,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>, pagination: PaginationMeta) -> Self {
        Self {
            data,
            meta: ResponseMeta { pagination },
        }
    }
}
