//! Sync engine: pushes local punches and audit entries, pulls remote
//! updates, and persists the sync cursors. A single straight-line
//! pass; retry and conflict policy belong to the caller.

use crate::attendance::AttendanceLog;
use crate::audit::AuditLogger;
use crate::database::Database;
use crate::sync::client::SyncClient;
use crate::sync::config::SyncConfig;
use crate::{DatabaseError, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

/// Summary of one sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Punches accepted by the backend.
    pub pushed: u64,
    /// Punches the backend rejected.
    pub rejected: u64,
    /// Remote records newly applied locally.
    pub pulled: u64,
    /// Audit entries uploaded.
    pub audit_uploaded: u64,
    /// Punches still awaiting upload after the pass.
    pub pending_changes: u64,
}

/// Orchestrates one push/pull cycle against the backend.
pub struct SyncEngine {
    client: SyncClient,
    db: Arc<Mutex<Database>>,
    device_id: Uuid,
}

impl SyncEngine {
    /// Create a new sync engine with the given client, database, and
    /// device identity.
    pub fn new(client: SyncClient, db: Arc<Mutex<Database>>, device_id: Uuid) -> Self {
        Self {
            client,
            db,
            device_id,
        }
    }

    /// Perform a full sync pass: push punches, upload audit entries,
    /// pull remote updates, persist cursors.
    pub async fn sync(&self, audit: Option<&AuditLogger>) -> Result<SyncOutcome> {
        let log = AttendanceLog::new(self.db.clone());
        let mut outcome = SyncOutcome::default();

        let previous_sync_at = {
            let db = self.lock()?;
            SyncConfig::load(db.conn())?.last_sync_at
        };

        let (pushed, rejected) = self.push_punches(&log).await?;
        outcome.pushed = pushed;
        outcome.rejected = rejected;

        if let Some(audit) = audit {
            outcome.audit_uploaded = self.push_audit(audit, previous_sync_at).await?;
        }

        let (pulled, newest_timestamp) = self.pull_updates(&log).await?;
        outcome.pulled = pulled;

        let db = self.lock()?;
        let mut config = SyncConfig::load(db.conn())?;
        config.last_sync_at = Some(chrono::Utc::now().timestamp());
        config.last_update_timestamp = newest_timestamp;
        config.save(db.conn())?;

        outcome.pending_changes = {
            drop(db);
            log.pending_count()?
        };

        info!(
            pushed = outcome.pushed,
            pulled = outcome.pulled,
            "sync pass complete"
        );
        Ok(outcome)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned("sync engine".to_string()).into())
    }

    /// Upload all pending punches and mark them synced.
    async fn push_punches(&self, log: &AttendanceLog) -> Result<(u64, u64)> {
        let pending = log.pending_records(self.device_id)?;
        if pending.is_empty() {
            return Ok((0, 0));
        }

        let record_ids: Vec<Uuid> = pending.iter().map(|r| r.record_id).collect();
        let response = self.client.sync_attendance(self.device_id, pending).await?;

        log.mark_synced(&record_ids)?;
        debug!(accepted = response.accepted, "attendance pushed");

        Ok((response.accepted, response.rejected))
    }

    /// Upload audit entries newer than the previous sync.
    async fn push_audit(&self, audit: &AuditLogger, since: Option<i64>) -> Result<u64> {
        let entries = audit.get_entries_since(since.unwrap_or(0))?;
        if entries.is_empty() {
            return Ok(0);
        }

        let records = entries.iter().map(|e| e.to_record()).collect();
        let response = self.client.sync_audit(self.device_id, records).await?;
        Ok(response.accepted)
    }

    /// Pull remote updates since the stored cursor, following
    /// `has_more` pages. Returns the applied count and the newest
    /// server timestamp seen.
    async fn pull_updates(&self, log: &AttendanceLog) -> Result<(u64, i64)> {
        let mut since = {
            let db = self.lock()?;
            SyncConfig::load(db.conn())?.last_update_timestamp
        };

        let mut applied = 0;
        loop {
            let response = self.client.get_updates_since(since).await?;
            applied += log.apply_updates(&response.records)?;
            since = response.server_timestamp;
            if !response.has_more {
                break;
            }
        }

        Ok((applied, since))
    }
}
