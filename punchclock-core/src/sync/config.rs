//! Sync configuration stored in the local database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DatabaseError, Result};

/// Sync configuration for this terminal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    pub sync_enabled: bool,
    pub device_id: Option<Uuid>,
    pub device_name: Option<String>,
    pub device_token: Option<String>,
    pub token_expires_at: Option<i64>,
    pub last_sync_at: Option<i64>,
    /// Server timestamp of the newest update already applied locally.
    pub last_update_timestamp: i64,
}

impl SyncConfig {
    /// Load sync config from the database. Returns default if no row exists.
    pub fn load(conn: &rusqlite::Connection) -> Result<Self> {
        let result = conn.query_row(
            "SELECT device_id, device_name, device_token, token_expires_at,
                    last_sync_at, last_update_timestamp, sync_enabled
             FROM sync_metadata WHERE id = 1",
            [],
            |row| {
                let device_id: Option<String> = row.get(0)?;
                let device_name: Option<String> = row.get(1)?;
                let device_token: Option<String> = row.get(2)?;
                let token_expires_at: Option<i64> = row.get(3)?;
                let last_sync_at: Option<i64> = row.get(4)?;
                let last_update_timestamp: i64 = row.get(5)?;
                let sync_enabled: bool = row.get(6)?;

                Ok(SyncConfig {
                    sync_enabled,
                    device_id: device_id.and_then(|s| Uuid::parse_str(&s).ok()),
                    device_name,
                    device_token,
                    token_expires_at,
                    last_sync_at,
                    last_update_timestamp,
                })
            },
        );

        match result {
            Ok(config) => Ok(config),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Self::default()),
            Err(e) => Err(DatabaseError::Sqlite(e).into()),
        }
    }

    /// Save sync config to the database (upsert).
    pub fn save(&self, conn: &rusqlite::Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO sync_metadata (id, device_id, device_name, device_token,
                                        token_expires_at, last_sync_at,
                                        last_update_timestamp, sync_enabled)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                device_id = excluded.device_id,
                device_name = excluded.device_name,
                device_token = excluded.device_token,
                token_expires_at = excluded.token_expires_at,
                last_sync_at = excluded.last_sync_at,
                last_update_timestamp = excluded.last_update_timestamp,
                sync_enabled = excluded.sync_enabled",
            rusqlite::params![
                self.device_id.map(|u| u.to_string()),
                self.device_name,
                self.device_token,
                self.token_expires_at,
                self.last_sync_at,
                self.last_update_timestamp,
                self.sync_enabled,
            ],
        )
        .map_err(DatabaseError::Sqlite)?;

        Ok(())
    }

    /// Whether the stored token is expired at the given Unix timestamp.
    ///
    /// A missing token or missing expiry counts as expired.
    pub fn token_expired_at(&self, now: i64) -> bool {
        match (&self.device_token, self.token_expires_at) {
            (Some(_), Some(expires)) => now >= expires,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[test]
    fn default_config() {
        let config = SyncConfig::default();
        assert!(!config.sync_enabled);
        assert!(config.device_id.is_none());
        assert!(config.device_token.is_none());
        assert_eq!(config.last_update_timestamp, 0);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();

        let config = SyncConfig {
            sync_enabled: true,
            device_id: Some(Uuid::new_v4()),
            device_name: Some("Front Door Kiosk".to_string()),
            device_token: Some("tok-abc".to_string()),
            token_expires_at: Some(1700003600),
            last_sync_at: Some(1700000000),
            last_update_timestamp: 1699999999,
        };
        config.save(db.conn()).unwrap();

        let loaded = SyncConfig::load(db.conn()).unwrap();
        assert!(loaded.sync_enabled);
        assert_eq!(loaded.device_id, config.device_id);
        assert_eq!(loaded.device_name.as_deref(), Some("Front Door Kiosk"));
        assert_eq!(loaded.device_token.as_deref(), Some("tok-abc"));
        assert_eq!(loaded.last_update_timestamp, 1699999999);
    }

    #[test]
    fn load_from_empty_table_returns_default() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();

        let loaded = SyncConfig::load(db.conn()).unwrap();
        assert!(loaded.device_id.is_none());
        assert_eq!(loaded.last_update_timestamp, 0);
    }

    #[test]
    fn token_expiry() {
        let mut config = SyncConfig::default();
        assert!(config.token_expired_at(0));

        config.device_token = Some("tok".to_string());
        assert!(config.token_expired_at(0));

        config.token_expires_at = Some(100);
        assert!(!config.token_expired_at(99));
        assert!(config.token_expired_at(100));
    }
}
