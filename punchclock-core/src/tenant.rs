//! Tenant configuration store.
//!
//! Holds the backend coordinates written once during device
//! provisioning: tenant code, display name, and server URL. The
//! composed descriptor is only available when all three fields are
//! present. Clearing while local data still references the tenant is
//! the caller's responsibility.

use crate::database::Database;
use crate::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Fully populated tenant descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub tenant_code: String,
    pub tenant_name: String,
    pub server_url: String,
}

/// Store for the device's tenant configuration.
pub struct TenantStore {
    db: Arc<Mutex<Database>>,
}

impl TenantStore {
    /// Create a tenant store over the given database.
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned("tenant store".to_string()).into())
    }

    /// Write all three tenant fields in one statement.
    ///
    /// No format validation of the code or URL is performed.
    pub fn provision(&self, tenant_code: &str, tenant_name: &str, server_url: &str) -> Result<()> {
        let db = self.lock()?;
        db.conn()
            .execute(
                "INSERT INTO tenant_config (id, tenant_code, tenant_name, server_url)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    tenant_code = excluded.tenant_code,
                    tenant_name = excluded.tenant_name,
                    server_url = excluded.server_url",
                rusqlite::params![tenant_code, tenant_name, server_url],
            )
            .map_err(DatabaseError::Sqlite)?;

        info!(tenant_code, "tenant provisioned");
        Ok(())
    }

    fn set_field(&self, column: &str, value: &str) -> Result<()> {
        let db = self.lock()?;
        // Column names are fixed by the callers below, never user input.
        let sql = format!(
            "INSERT INTO tenant_config (id, {col}) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET {col} = excluded.{col}",
            col = column
        );
        db.conn()
            .execute(&sql, [value])
            .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    /// Set the tenant code.
    pub fn set_tenant_code(&self, code: &str) -> Result<()> {
        self.set_field("tenant_code", code)
    }

    /// Set the tenant display name.
    pub fn set_tenant_name(&self, name: &str) -> Result<()> {
        self.set_field("tenant_name", name)
    }

    /// Set the backend server URL.
    pub fn set_server_url(&self, url: &str) -> Result<()> {
        self.set_field("server_url", url)
    }

    fn read_row(&self) -> Result<(Option<String>, Option<String>, Option<String>)> {
        let db = self.lock()?;
        let result = db.conn().query_row(
            "SELECT tenant_code, tenant_name, server_url FROM tenant_config WHERE id = 1",
            [],
            |row| {
                let code: Option<String> = row.get(0)?;
                let name: Option<String> = row.get(1)?;
                let url: Option<String> = row.get(2)?;
                Ok((code, name, url))
            },
        );

        match result {
            Ok(fields) => Ok(fields),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok((None, None, None)),
            Err(e) => Err(DatabaseError::Sqlite(e).into()),
        }
    }

    /// The stored tenant code, if any.
    pub fn tenant_code(&self) -> Result<Option<String>> {
        Ok(self.read_row()?.0)
    }

    /// The stored tenant display name, if any.
    pub fn tenant_name(&self) -> Result<Option<String>> {
        Ok(self.read_row()?.1)
    }

    /// The stored server URL, if any.
    pub fn server_url(&self) -> Result<Option<String>> {
        Ok(self.read_row()?.2)
    }

    /// The composed descriptor, only when code, name and URL are all set.
    pub fn tenant_info(&self) -> Result<Option<TenantInfo>> {
        let (code, name, url) = self.read_row()?;
        match (code, name, url) {
            (Some(tenant_code), Some(tenant_name), Some(server_url)) => Ok(Some(TenantInfo {
                tenant_code,
                tenant_name,
                server_url,
            })),
            _ => Ok(None),
        }
    }

    /// Whether the device is fully provisioned.
    pub fn is_configured(&self) -> Result<bool> {
        Ok(self.tenant_info()?.is_some())
    }

    /// Clear all tenant fields.
    pub fn clear(&self) -> Result<()> {
        let db = self.lock()?;
        db.conn()
            .execute(
                "UPDATE tenant_config SET tenant_code = NULL, tenant_name = NULL, server_url = NULL
                 WHERE id = 1",
                [],
            )
            .map_err(DatabaseError::Sqlite)?;

        info!("tenant configuration cleared");
        Ok(())
    }
}
