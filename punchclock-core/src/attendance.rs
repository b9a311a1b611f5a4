//! Local punch log: face-verified punches recorded on this terminal,
//! tracked through a pending/synced lifecycle until uploaded.

use crate::database::Database;
use crate::sync::models::{AttendanceRecord, PunchType};
use crate::{DatabaseError, Result};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

/// Store for locally recorded attendance punches.
pub struct AttendanceLog {
    db: Arc<Mutex<Database>>,
}

impl AttendanceLog {
    /// Create an attendance log over the given database.
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned("attendance log".to_string()).into())
    }

    /// Record a punch at the current time. Returns the stable record id.
    pub fn record_punch(
        &self,
        employee_id: i64,
        punch_type: PunchType,
        verify_method: &str,
    ) -> Result<Uuid> {
        let record_id = Uuid::new_v4();
        let now = chrono::Utc::now().timestamp();

        let db = self.lock()?;
        db.conn()
            .execute(
                "INSERT INTO punches (record_id, employee_id, punch_time, punch_type,
                                      verify_method, sync_state)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
                rusqlite::params![
                    record_id.to_string(),
                    employee_id,
                    now,
                    punch_type.as_str(),
                    verify_method,
                ],
            )
            .map_err(DatabaseError::Sqlite)?;

        debug!(employee_id, punch_type = punch_type.as_str(), "punch recorded");
        Ok(record_id)
    }

    /// All punches not yet uploaded, as wire records.
    pub fn pending_records(&self, origin_device_id: Uuid) -> Result<Vec<AttendanceRecord>> {
        let db = self.lock()?;
        let mut stmt = db
            .conn()
            .prepare(
                "SELECT record_id, employee_id, punch_time, punch_type, verify_method
                 FROM punches WHERE sync_state = 'pending' ORDER BY punch_time",
            )
            .map_err(DatabaseError::Sqlite)?;

        let rows = stmt
            .query_map([], |row| {
                let record_id: String = row.get(0)?;
                let employee_id: i64 = row.get(1)?;
                let punch_time: i64 = row.get(2)?;
                let punch_type: String = row.get(3)?;
                let verify_method: String = row.get(4)?;
                Ok((record_id, employee_id, punch_time, punch_type, verify_method))
            })
            .map_err(DatabaseError::Sqlite)?;

        let mut records = Vec::new();
        for row in rows {
            let (record_id, employee_id, punch_time, punch_type, verify_method) =
                row.map_err(DatabaseError::Sqlite)?;
            let record_id = Uuid::parse_str(&record_id).map_err(|e| {
                DatabaseError::Serialization(format!("Invalid record_id: {}", e))
            })?;
            records.push(AttendanceRecord {
                record_id,
                employee_id,
                punch_time,
                punch_type: PunchType::parse(&punch_type),
                verify_method,
                origin_device_id,
            });
        }
        Ok(records)
    }

    /// Number of punches still awaiting upload.
    pub fn pending_count(&self) -> Result<u64> {
        let db = self.lock()?;
        let count: u64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM punches WHERE sync_state = 'pending'",
                [],
                |row| row.get(0),
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(count)
    }

    /// Mark the given punches as uploaded.
    pub fn mark_synced(&self, record_ids: &[Uuid]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let db = self.lock()?;
        for record_id in record_ids {
            db.conn()
                .execute(
                    "UPDATE punches SET sync_state = 'synced', synced_at = ?1
                     WHERE record_id = ?2",
                    rusqlite::params![now, record_id.to_string()],
                )
                .map_err(DatabaseError::Sqlite)?;
        }
        Ok(())
    }

    /// Apply records pulled from the backend. Records that already
    /// exist locally (by record id) are skipped, so re-applying the
    /// same batch is harmless.
    pub fn apply_updates(&self, records: &[AttendanceRecord]) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();
        let db = self.lock()?;
        let mut applied = 0;
        for record in records {
            let inserted = db
                .conn()
                .execute(
                    "INSERT OR IGNORE INTO punches
                        (record_id, employee_id, punch_time, punch_type,
                         verify_method, sync_state, synced_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 'synced', ?6)",
                    rusqlite::params![
                        record.record_id.to_string(),
                        record.employee_id,
                        record.punch_time,
                        record.punch_type.as_str(),
                        record.verify_method,
                        now,
                    ],
                )
                .map_err(DatabaseError::Sqlite)?;
            applied += inserted as u64;
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> AttendanceLog {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();
        AttendanceLog::new(Arc::new(Mutex::new(db)))
    }

    #[test]
    fn recorded_punch_is_pending() {
        let log = make_log();
        let device_id = Uuid::new_v4();

        let record_id = log.record_punch(9, PunchType::In, "face").unwrap();
        assert_eq!(log.pending_count().unwrap(), 1);

        let pending = log.pending_records(device_id).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record_id, record_id);
        assert_eq!(pending[0].employee_id, 9);
        assert_eq!(pending[0].punch_type, PunchType::In);
        assert_eq!(pending[0].verify_method, "face");
        assert_eq!(pending[0].origin_device_id, device_id);
    }

    #[test]
    fn mark_synced_clears_pending() {
        let log = make_log();
        let a = log.record_punch(1, PunchType::In, "face").unwrap();
        let b = log.record_punch(1, PunchType::Out, "face").unwrap();
        assert_eq!(log.pending_count().unwrap(), 2);

        log.mark_synced(&[a]).unwrap();
        assert_eq!(log.pending_count().unwrap(), 1);

        let pending = log.pending_records(Uuid::new_v4()).unwrap();
        assert_eq!(pending[0].record_id, b);
    }

    #[test]
    fn apply_updates_is_idempotent() {
        let log = make_log();
        let records = vec![AttendanceRecord {
            record_id: Uuid::new_v4(),
            employee_id: 3,
            punch_time: 1700000000,
            punch_type: PunchType::In,
            verify_method: "face".to_string(),
            origin_device_id: Uuid::new_v4(),
        }];

        assert_eq!(log.apply_updates(&records).unwrap(), 1);
        assert_eq!(log.apply_updates(&records).unwrap(), 0);

        // Pulled records arrive already synced
        assert_eq!(log.pending_count().unwrap(), 0);
    }

    #[test]
    fn apply_updates_keeps_local_pending_rows() {
        let log = make_log();
        let local = log.record_punch(4, PunchType::In, "face").unwrap();

        // An update echoing the same record must not duplicate or reset it
        let echo = vec![AttendanceRecord {
            record_id: local,
            employee_id: 4,
            punch_time: 1700000000,
            punch_type: PunchType::In,
            verify_method: "face".to_string(),
            origin_device_id: Uuid::new_v4(),
        }];
        assert_eq!(log.apply_updates(&echo).unwrap(), 0);
        assert_eq!(log.pending_count().unwrap(), 1);
    }
}
