//! CMS Audit Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities and error handling for the CMS audit workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Common error type and result alias
//! - **Logging**: `tracing` subscriber setup driven by environment variables
//! - **Time**: ISO-8601 parsing and formatting for audit timestamps
//!
//! # Example
//!
//! ```no_run
//! use cms_audit_common::time::parse_instant;
//!
//! let from = parse_instant("2024-01-01").unwrap();
//! assert_eq!(from.to_rfc3339(), "2024-01-01T00:00:00+00:00");
//! ```

pub mod error;
pub mod logging;
pub mod time;

// Re-export commonly used types
pub use error::{CommonError, Result};
