//! Shared utilities and types for feature modules
//!
//! - **pagination**: page metadata and the `{data, meta}` list envelope
//! - **query_string**: bracketed query-string parameter access

pub mod pagination;
pub mod query_string;

pub use pagination::{ListResponse, PaginationMeta, ResponseMeta};
pub use query_string::QueryParams;
