//! Backend synchronization for the attendance terminal.
//!
//! - Device registration and bearer-token refresh
//! - Attendance delta upload with a required tenant header
//! - Update polling by server timestamp
//! - Audit trail upload
//!
//! The client is a plain boundary: no retry, backoff, or conflict
//! resolution lives here.

pub mod client;
pub mod config;
pub mod engine;
pub mod models;

pub use client::SyncClient;
pub use config::SyncConfig;
pub use engine::{SyncEngine, SyncOutcome};
pub use models::{AttendanceRecord, AuditRecord, PunchType};
