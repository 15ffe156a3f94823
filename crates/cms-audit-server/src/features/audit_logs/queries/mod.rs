//! Audit log queries

pub mod list;

pub use list::{ReadAuditLogsQuery, ReadQueryError};
