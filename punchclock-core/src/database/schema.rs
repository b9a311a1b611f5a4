//! Database schema and connection management.

use crate::{DatabaseError, Result};
use rusqlite::Connection;
use std::path::Path;

/// Current schema version. Incremented when the schema changes.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Main database connection and schema manager
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(DatabaseError::Sqlite)?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(DatabaseError::Sqlite)?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database for testing
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Sqlite)?;

        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(DatabaseError::Sqlite)?;

        Ok(Self { conn })
    }

    /// Access the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Initialize the database schema
    pub fn initialize_schema(&self) -> Result<()> {
        self.create_db_metadata_table()?;
        self.create_session_state_table()?;
        self.create_tenant_config_table()?;
        self.create_sync_metadata_table()?;
        self.create_punches_table()?;
        self.create_indexes()?;
        Ok(())
    }

    fn create_db_metadata_table(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS db_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
                [],
            )
            .map_err(DatabaseError::Sqlite)?;

        self.conn
            .execute(
                "INSERT OR IGNORE INTO db_metadata (id, version, created_at)
             VALUES (1, ?1, strftime('%s','now'))",
                [CURRENT_SCHEMA_VERSION],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    // Single-row table: the whole session is written in one statement.
    fn create_session_state_table(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS session_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                user_id INTEGER,
                username TEXT,
                full_name TEXT,
                role TEXT,
                last_activity INTEGER
            )",
                [],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    fn create_tenant_config_table(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS tenant_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                tenant_code TEXT,
                tenant_name TEXT,
                server_url TEXT
            )",
                [],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    fn create_sync_metadata_table(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS sync_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                device_id TEXT,
                device_name TEXT,
                device_token TEXT,
                token_expires_at INTEGER,
                last_sync_at INTEGER,
                last_update_timestamp INTEGER NOT NULL DEFAULT 0,
                sync_enabled INTEGER NOT NULL DEFAULT 0
            )",
                [],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    fn create_punches_table(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS punches (
                punch_id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id TEXT NOT NULL UNIQUE,
                employee_id INTEGER NOT NULL,
                punch_time INTEGER NOT NULL,
                punch_type TEXT NOT NULL,
                verify_method TEXT NOT NULL,
                sync_state TEXT NOT NULL DEFAULT 'pending',
                synced_at INTEGER
            )",
                [],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    fn create_indexes(&self) -> Result<()> {
        let statements = [
            "CREATE INDEX IF NOT EXISTS idx_punches_sync_state ON punches(sync_state)",
            "CREATE INDEX IF NOT EXISTS idx_punches_employee ON punches(employee_id, punch_time)",
        ];
        for sql in statements {
            self.conn.execute(sql, []).map_err(DatabaseError::Sqlite)?;
        }
        Ok(())
    }

    /// Read the stored schema version
    pub fn schema_version(&self) -> Result<i32> {
        let version: i32 = self
            .conn
            .query_row("SELECT version FROM db_metadata WHERE id = 1", [], |row| {
                row.get(0)
            })
            .map_err(DatabaseError::Sqlite)?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_schema_creates_tables() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();

        for table in ["session_state", "tenant_config", "sync_metadata", "punches"] {
            let exists: bool = db
                .conn()
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "missing table: {}", table);
        }
    }

    #[test]
    fn schema_version_is_current() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();
        assert_eq!(db.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn initialize_schema_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.initialize_schema().unwrap();
        db.initialize_schema().unwrap();
        assert_eq!(db.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }
}
