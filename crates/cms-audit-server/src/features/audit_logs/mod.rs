//! Audit log read feature
//!
//! `GET /api/audit-logs`, gated by the read-audit-logs policy.

pub mod queries;
pub mod routes;


pub use routes::audit_logs_routes;
