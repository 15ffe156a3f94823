//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by shared utilities
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid date '{0}': expected RFC 3339, YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD")]
    InvalidDate(String),
}
