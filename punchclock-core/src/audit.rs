//! Audit logging for security events and attendance operations.
//!
//! Entries are appended as JSON lines to a local file and uploaded to
//! the backend by the sync engine.

use crate::sync::models::AuditRecord;
use crate::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Audit log entry types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuditEventType {
    /// Session events
    LoginSucceeded { user_id: i64 },
    LoginFailed { username: String },
    LoggedOut,
    SessionExpired,

    /// Provisioning events
    TenantProvisioned { tenant_code: String },
    TenantCleared,
    DeviceRegistered { device_id: String },
    TokenRefreshed,

    /// Attendance events
    PunchRecorded { employee_id: i64 },
    AttendanceSynced { count: u64 },
    AuditSynced { count: u64 },
    SyncFailed { reason: String },
}

impl AuditEventType {
    /// Short wire name for the event, used in uploaded audit records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::LoginFailed { .. } => "login_failed",
            Self::LoggedOut => "logged_out",
            Self::SessionExpired => "session_expired",
            Self::TenantProvisioned { .. } => "tenant_provisioned",
            Self::TenantCleared => "tenant_cleared",
            Self::DeviceRegistered { .. } => "device_registered",
            Self::TokenRefreshed => "token_refreshed",
            Self::PunchRecorded { .. } => "punch_recorded",
            Self::AttendanceSynced { .. } => "attendance_synced",
            Self::AuditSynced { .. } => "audit_synced",
            Self::SyncFailed { .. } => "sync_failed",
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: AuditEventType,
    /// Event severity (0-5, where 5 is most critical)
    pub severity: u8,
    /// Additional context data
    pub context: String,
}

impl AuditEntry {
    /// Convert to the wire record uploaded during audit sync.
    pub fn to_record(&self) -> AuditRecord {
        AuditRecord {
            event: self.event_type.name().to_string(),
            severity: self.severity,
            context: self.context.clone(),
            occurred_at: self.timestamp.timestamp(),
        }
    }
}

/// Audit logger
pub struct AuditLogger {
    log_file: PathBuf,
    writer: Arc<Mutex<Option<File>>>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_dir: PathBuf) -> Result<Self> {
        let log_file = log_dir.join("audit.log");

        std::fs::create_dir_all(&log_dir).map_err(|e| {
            DatabaseError::FileIo(format!("Failed to create audit log directory: {}", e))
        })?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| DatabaseError::FileIo(format!("Failed to open audit log: {}", e)))?;

        info!("Audit logger initialized: {:?}", log_file);

        Ok(Self {
            log_file,
            writer: Arc::new(Mutex::new(Some(file))),
        })
    }

    /// Log an audit event
    pub fn log(&self, event_type: AuditEventType, context: &str) -> Result<()> {
        let severity = Self::severity_for_event(&event_type);

        let entry = AuditEntry {
            timestamp: Utc::now(),
            event_type,
            severity,
            context: context.to_string(),
        };

        let json = serde_json::to_string(&entry).map_err(|e| {
            DatabaseError::Serialization(format!("Failed to serialize audit entry: {}", e))
        })?;

        let log_line = format!("{}\n", json);

        if let Some(ref mut writer) = *self
            .writer
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned("audit writer".to_string()))?
        {
            writer
                .write_all(log_line.as_bytes())
                .map_err(|e| DatabaseError::FileIo(format!("Failed to write audit log: {}", e)))?;
            writer
                .flush()
                .map_err(|e| DatabaseError::FileIo(format!("Failed to flush audit log: {}", e)))?;
        }

        Ok(())
    }

    /// Get severity level for an event type (0-5)
    fn severity_for_event(event: &AuditEventType) -> u8 {
        match event {
            // Critical events (5)
            AuditEventType::TenantCleared => 5,

            // High severity (4)
            AuditEventType::TenantProvisioned { .. }
            | AuditEventType::DeviceRegistered { .. } => 4,

            // Medium-high severity (3)
            AuditEventType::LoginFailed { .. } | AuditEventType::SyncFailed { .. } => 3,

            // Medium severity (2)
            AuditEventType::LoginSucceeded { .. } | AuditEventType::SessionExpired => 2,

            // Low severity (1)
            AuditEventType::PunchRecorded { .. } | AuditEventType::LoggedOut => 1,

            // Info (0)
            AuditEventType::TokenRefreshed
            | AuditEventType::AttendanceSynced { .. }
            | AuditEventType::AuditSynced { .. } => 0,
        }
    }

    /// Get the most recent audit entries (newest first)
    pub fn get_entries(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let content = std::fs::read_to_string(&self.log_file)
            .map_err(|e| DatabaseError::FileIo(format!("Failed to read audit log: {}", e)))?;

        let entries: Vec<AuditEntry> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<AuditEntry>(line).ok())
            .rev()
            .take(limit)
            .collect();

        Ok(entries)
    }

    /// Get audit entries since a specific Unix timestamp (oldest first)
    pub fn get_entries_since(&self, since: i64) -> Result<Vec<AuditEntry>> {
        let content = std::fs::read_to_string(&self.log_file)
            .map_err(|e| DatabaseError::FileIo(format!("Failed to read audit log: {}", e)))?;

        let entries: Vec<AuditEntry> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<AuditEntry>(line).ok())
            .filter(|entry| entry.timestamp.timestamp() > since)
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_dir() -> PathBuf {
        let dir = std::env::temp_dir()
            .join("punchclock_test_audit")
            .join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn severity_levels() {
        assert_eq!(
            AuditLogger::severity_for_event(&AuditEventType::TenantCleared),
            5
        );
        assert_eq!(
            AuditLogger::severity_for_event(&AuditEventType::DeviceRegistered {
                device_id: "d".to_string()
            }),
            4
        );
        assert_eq!(
            AuditLogger::severity_for_event(&AuditEventType::LoginFailed {
                username: "u".to_string()
            }),
            3
        );
        assert_eq!(
            AuditLogger::severity_for_event(&AuditEventType::LoginSucceeded { user_id: 1 }),
            2
        );
        assert_eq!(
            AuditLogger::severity_for_event(&AuditEventType::PunchRecorded { employee_id: 1 }),
            1
        );
        assert_eq!(
            AuditLogger::severity_for_event(&AuditEventType::TokenRefreshed),
            0
        );
    }

    #[test]
    fn log_and_get_entries() {
        let tmp = make_test_dir();
        let logger = AuditLogger::new(tmp.clone()).unwrap();

        logger
            .log(AuditEventType::LoginSucceeded { user_id: 7 }, "kiosk login")
            .unwrap();
        logger.log(AuditEventType::LoggedOut, "shift end").unwrap();

        let entries = logger.get_entries(10).unwrap();
        assert_eq!(entries.len(), 2);
        // get_entries returns most recent first
        assert!(matches!(entries[0].event_type, AuditEventType::LoggedOut));
        assert!(matches!(
            entries[1].event_type,
            AuditEventType::LoginSucceeded { user_id: 7 }
        ));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn get_entries_with_limit() {
        let tmp = make_test_dir();
        let logger = AuditLogger::new(tmp.clone()).unwrap();

        for i in 0..5 {
            logger
                .log(AuditEventType::PunchRecorded { employee_id: i }, "punch")
                .unwrap();
        }

        let entries = logger.get_entries(2).unwrap();
        assert_eq!(entries.len(), 2);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn get_entries_since_filters() {
        let tmp = make_test_dir();
        let logger = AuditLogger::new(tmp.clone()).unwrap();

        let before = Utc::now().timestamp() - 2;

        logger.log(AuditEventType::TokenRefreshed, "refresh").unwrap();
        logger
            .log(AuditEventType::AttendanceSynced { count: 3 }, "sync")
            .unwrap();

        let entries = logger.get_entries_since(before).unwrap();
        assert_eq!(entries.len(), 2);

        let future = Utc::now().timestamp() + 60;
        let entries = logger.get_entries_since(future).unwrap();
        assert!(entries.is_empty());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn entry_converts_to_wire_record() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event_type: AuditEventType::PunchRecorded { employee_id: 42 },
            severity: 1,
            context: "front door".to_string(),
        };

        let record = entry.to_record();
        assert_eq!(record.event, "punch_recorded");
        assert_eq!(record.severity, 1);
        assert_eq!(record.context, "front door");
        assert_eq!(record.occurred_at, entry.timestamp.timestamp());
    }

    #[test]
    fn entry_serialization_roundtrip() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event_type: AuditEventType::SyncFailed {
                reason: "offline".to_string(),
            },
            severity: 3,
            context: "nightly sync".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.severity, 3);
        assert_eq!(deserialized.context, "nightly sync");
    }
}
