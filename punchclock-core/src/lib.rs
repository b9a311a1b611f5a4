//! Punchclock Core Library
//!
//! Device-local state and backend synchronization for a kiosk
//! attendance terminal: session and tenant stores, the local punch
//! log, the sync API client, and audit logging.

pub mod attendance;
pub mod audit;
pub mod database;
pub mod platform;
pub mod session;
pub mod sync;
pub mod tenant;

pub use attendance::AttendanceLog;
pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use database::Database;
pub use platform::{
    ensure_data_dir, get_audit_log_dir, get_config_dir, get_data_dir, get_default_db_path,
};
pub use session::{Role, Session, SessionStore, SESSION_TIMEOUT_SECS};
pub use sync::{SyncClient, SyncConfig, SyncEngine, SyncOutcome};
pub use tenant::{TenantInfo, TenantStore};

use thiserror::Error;

/// Result type for attendance client operations
pub type Result<T> = std::result::Result<T, AttendanceError>;

/// General error type for attendance client operations
#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend rejected request ({status}): {body}")]
    Backend { status: u16, body: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the local persistence layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("File IO error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}
