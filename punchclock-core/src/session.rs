//! Device session store: the locally cached identity and role of the
//! currently authenticated terminal user.
//!
//! All fields live in a single row so that login and logout are single
//! atomic statements. A session is "logged in" iff a user id is
//! present; an absent activity timestamp counts as expired.

use crate::database::Database;
use crate::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Inactivity threshold after which a session is considered expired.
pub const SESSION_TIMEOUT_SECS: i64 = 30 * 60;

/// Role of the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Supervisor,
    Employee,
}

impl Role {
    /// Convert a role to its string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Supervisor => "supervisor",
            Self::Employee => "employee",
        }
    }

    /// Parse a role from its string representation.
    ///
    /// Unknown strings fall back to `Employee` (least privilege).
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            "supervisor" => Self::Supervisor,
            _ => Self::Employee,
        }
    }
}

/// Snapshot of the current session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub last_activity: Option<i64>,
}

impl Session {
    /// Whether the session is expired at the given Unix timestamp.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.last_activity {
            Some(last) => now - last > SESSION_TIMEOUT_SECS,
            None => true,
        }
    }
}

/// Store for the current device session.
pub struct SessionStore {
    db: Arc<Mutex<Database>>,
}

impl SessionStore {
    /// Create a session store over the given database.
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned("session store".to_string()).into())
    }

    /// Write all session fields atomically and stamp fresh activity.
    pub fn login(&self, user_id: i64, username: &str, full_name: &str, role: Role) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let db = self.lock()?;
        db.conn()
            .execute(
                "INSERT INTO session_state (id, user_id, username, full_name, role, last_activity)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    user_id = excluded.user_id,
                    username = excluded.username,
                    full_name = excluded.full_name,
                    role = excluded.role,
                    last_activity = excluded.last_activity",
                rusqlite::params![user_id, username, full_name, role.as_str(), now],
            )
            .map_err(DatabaseError::Sqlite)?;

        info!(user_id, username, "session started");
        Ok(())
    }

    /// Clear all session fields.
    pub fn logout(&self) -> Result<()> {
        let db = self.lock()?;
        db.conn()
            .execute(
                "INSERT INTO session_state (id, user_id, username, full_name, role, last_activity)
                 VALUES (1, NULL, NULL, NULL, NULL, NULL)
                 ON CONFLICT(id) DO UPDATE SET
                    user_id = NULL,
                    username = NULL,
                    full_name = NULL,
                    role = NULL,
                    last_activity = NULL",
                [],
            )
            .map_err(DatabaseError::Sqlite)?;

        info!("session cleared");
        Ok(())
    }

    /// Snapshot of the current session, `None` when nobody is logged in.
    pub fn current(&self) -> Result<Option<Session>> {
        let db = self.lock()?;
        let result = db.conn().query_row(
            "SELECT user_id, username, full_name, role, last_activity
             FROM session_state WHERE id = 1",
            [],
            |row| {
                let user_id: Option<i64> = row.get(0)?;
                let username: Option<String> = row.get(1)?;
                let full_name: Option<String> = row.get(2)?;
                let role: Option<String> = row.get(3)?;
                let last_activity: Option<i64> = row.get(4)?;
                Ok((user_id, username, full_name, role, last_activity))
            },
        );

        match result {
            Ok((Some(user_id), username, full_name, role, last_activity)) => Ok(Some(Session {
                user_id,
                username: username.unwrap_or_default(),
                full_name: full_name.unwrap_or_default(),
                role: role.as_deref().map(Role::parse).unwrap_or(Role::Employee),
                last_activity,
            })),
            Ok(_) => Ok(None),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::Sqlite(e).into()),
        }
    }

    /// Id of the logged-in user, if any.
    pub fn current_user_id(&self) -> Result<Option<i64>> {
        Ok(self.current()?.map(|s| s.user_id))
    }

    /// Whether a user is currently logged in.
    pub fn is_logged_in(&self) -> Result<bool> {
        Ok(self.current()?.is_some())
    }

    /// Bump the activity timestamp (resets the expiry window).
    pub fn update_last_activity(&self) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let db = self.lock()?;
        db.conn()
            .execute(
                "UPDATE session_state SET last_activity = ?1 WHERE id = 1",
                [now],
            )
            .map_err(DatabaseError::Sqlite)?;
        Ok(())
    }

    /// Whether the session has been inactive longer than the fixed
    /// 30-minute threshold. No recorded activity counts as expired.
    pub fn is_session_expired(&self) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        match self.current()? {
            Some(session) => Ok(session.is_expired_at(now)),
            None => Ok(true),
        }
    }

    fn role(&self) -> Result<Option<Role>> {
        Ok(self.current()?.map(|s| s.role))
    }

    /// Admin role check. Absent session reads as false.
    pub fn is_admin(&self) -> Result<bool> {
        Ok(matches!(self.role()?, Some(Role::Admin)))
    }

    /// Only admins may manage employees.
    pub fn can_manage_employees(&self) -> Result<bool> {
        self.is_admin()
    }

    /// Admins and supervisors may view reports.
    pub fn can_view_reports(&self) -> Result<bool> {
        Ok(matches!(
            self.role()?,
            Some(Role::Admin) | Some(Role::Supervisor)
        ))
    }
}
