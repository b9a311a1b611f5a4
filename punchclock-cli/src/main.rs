use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use punchclock_core::database::Database;
use punchclock_core::sync::models::{PunchType, RefreshTokenRequest, RegisterDeviceRequest};
use punchclock_core::sync::{SyncClient, SyncConfig, SyncEngine};
use punchclock_core::{
    ensure_data_dir, get_audit_log_dir, get_default_db_path, AttendanceLog, AuditEventType,
    AuditLogger, Role, SessionStore, TenantStore,
};
use std::sync::{Arc, Mutex};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

/// Punchclock - face-recognition attendance terminal client
#[derive(Parser)]
#[command(name = "punchclock")]
#[command(about = "Attendance terminal client for a multi-tenant backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the tenant this device belongs to
    Provision {
        /// Tenant code
        #[arg(long)]
        code: String,

        /// Tenant display name
        #[arg(long)]
        name: String,

        /// Backend server URL
        #[arg(long)]
        server_url: String,
    },

    /// Start a user session on this terminal
    Login {
        /// Numeric user id
        #[arg(long)]
        user_id: i64,

        /// Username
        #[arg(long)]
        username: String,

        /// Full display name
        #[arg(long)]
        full_name: String,

        /// Role: admin, supervisor, or employee
        #[arg(long, default_value = "employee")]
        role: String,
    },

    /// End the current session
    Logout,

    /// Record an attendance punch
    Punch {
        /// Employee id
        #[arg(long)]
        employee_id: i64,

        /// Record a punch-out instead of a punch-in
        #[arg(long)]
        out: bool,
    },

    /// Register this device with the backend
    RegisterDevice {
        /// Human-readable device name
        #[arg(long)]
        device_name: String,
    },

    /// Push pending punches and pull remote updates
    Sync,

    /// Show tenant, session, and sync state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();

    ensure_data_dir().context("failed to create data directory")?;
    let db = Database::open(get_default_db_path()).context("failed to open terminal database")?;
    db.initialize_schema()
        .context("failed to initialize schema")?;
    let db = Arc::new(Mutex::new(db));

    let audit = AuditLogger::new(get_audit_log_dir()).context("failed to open audit log")?;

    match cli.command {
        Commands::Provision {
            code,
            name,
            server_url,
        } => {
            let tenants = TenantStore::new(db.clone());
            tenants.provision(&code, &name, &server_url)?;
            audit.log(
                AuditEventType::TenantProvisioned { tenant_code: code.clone() },
                &name,
            )?;
            println!("Provisioned tenant '{}' at {}", code, server_url);
        }

        Commands::Login {
            user_id,
            username,
            full_name,
            role,
        } => {
            let sessions = SessionStore::new(db.clone());
            sessions.login(user_id, &username, &full_name, Role::parse(&role))?;
            audit.log(AuditEventType::LoginSucceeded { user_id }, &username)?;
            println!("Logged in as {} ({})", username, role);
        }

        Commands::Logout => {
            let sessions = SessionStore::new(db.clone());
            sessions.logout()?;
            audit.log(AuditEventType::LoggedOut, "")?;
            println!("Logged out");
        }

        Commands::Punch { employee_id, out } => {
            let sessions = SessionStore::new(db.clone());
            if sessions.is_session_expired()? {
                sessions.logout()?;
                audit.log(AuditEventType::SessionExpired, "punch refused")?;
                bail!("session expired; log in again");
            }
            sessions.update_last_activity()?;

            let punch_type = if out { PunchType::Out } else { PunchType::In };
            let log = AttendanceLog::new(db.clone());
            let record_id = log.record_punch(employee_id, punch_type, "face")?;
            audit.log(AuditEventType::PunchRecorded { employee_id }, "")?;
            println!(
                "Recorded punch-{} for employee {} ({})",
                punch_type.as_str(),
                employee_id,
                record_id
            );
        }

        Commands::RegisterDevice { device_name } => {
            let tenant = required_tenant(&db)?;
            let client = SyncClient::new(&tenant.server_url, &tenant.tenant_code, None)?;

            let device_id = Uuid::new_v4();
            let response = client
                .register_device(&RegisterDeviceRequest {
                    device_id,
                    device_name: device_name.clone(),
                    device_model: std::env::consts::OS.to_string(),
                    app_version: env!("CARGO_PKG_VERSION").to_string(),
                })
                .await?;

            let config = SyncConfig {
                sync_enabled: true,
                device_id: Some(device_id),
                device_name: Some(device_name),
                device_token: Some(response.device_token),
                token_expires_at: Some(response.token_expires_at),
                last_sync_at: None,
                last_update_timestamp: 0,
            };
            {
                let db = db.lock().expect("database lock");
                config.save(db.conn())?;
            }

            audit.log(
                AuditEventType::DeviceRegistered {
                    device_id: device_id.to_string(),
                },
                "",
            )?;
            println!(
                "Registered device {} (approved: {})",
                device_id, response.approved
            );
        }

        Commands::Sync => {
            let tenant = required_tenant(&db)?;
            let mut config = {
                let db = db.lock().expect("database lock");
                SyncConfig::load(db.conn())?
            };
            let device_id = config
                .device_id
                .context("device not registered; run register-device first")?;

            let mut client = SyncClient::new(
                &tenant.server_url,
                &tenant.tenant_code,
                config.device_token.clone(),
            )?;

            // Refresh the bearer token first if it has lapsed
            let now = chrono::Utc::now().timestamp();
            if config.token_expired_at(now) {
                let current = config
                    .device_token
                    .clone()
                    .context("device has no token; run register-device first")?;
                info!("device token expired; refreshing");
                let refreshed = client
                    .refresh_token(&RefreshTokenRequest {
                        device_id,
                        device_token: current,
                    })
                    .await?;
                client.set_device_token(refreshed.device_token.clone());
                config.device_token = Some(refreshed.device_token);
                config.token_expires_at = Some(refreshed.token_expires_at);
                {
                    let db = db.lock().expect("database lock");
                    config.save(db.conn())?;
                }
                audit.log(AuditEventType::TokenRefreshed, "")?;
            }

            let engine = SyncEngine::new(client, db.clone(), device_id);
            match engine.sync(Some(&audit)).await {
                Ok(outcome) => {
                    audit.log(
                        AuditEventType::AttendanceSynced {
                            count: outcome.pushed,
                        },
                        "",
                    )?;
                    println!(
                        "Sync complete: pushed {}, pulled {}, {} pending",
                        outcome.pushed, outcome.pulled, outcome.pending_changes
                    );
                }
                Err(e) => {
                    audit.log(
                        AuditEventType::SyncFailed {
                            reason: e.to_string(),
                        },
                        "",
                    )?;
                    return Err(e.into());
                }
            }
        }

        Commands::Status => {
            let tenants = TenantStore::new(db.clone());
            match tenants.tenant_info()? {
                Some(info) => println!(
                    "Tenant: {} ({}) at {}",
                    info.tenant_name, info.tenant_code, info.server_url
                ),
                None => println!("Tenant: not provisioned"),
            }

            let sessions = SessionStore::new(db.clone());
            match sessions.current()? {
                Some(session) => println!(
                    "Session: {} ({}), role {}, expired: {}",
                    session.username,
                    session.user_id,
                    session.role.as_str(),
                    sessions.is_session_expired()?
                ),
                None => println!("Session: none"),
            }

            let config = {
                let db = db.lock().expect("database lock");
                SyncConfig::load(db.conn())?
            };
            match config.device_id {
                Some(device_id) => println!(
                    "Device: {} (last sync: {})",
                    device_id,
                    config
                        .last_sync_at
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "never".to_string())
                ),
                None => println!("Device: not registered"),
            }

            let log = AttendanceLog::new(db.clone());
            println!("Pending punches: {}", log.pending_count()?);
        }
    }

    Ok(())
}

fn required_tenant(
    db: &Arc<Mutex<Database>>,
) -> Result<punchclock_core::TenantInfo> {
    let tenants = TenantStore::new(db.clone());
    tenants
        .tenant_info()?
        .context("tenant not provisioned; run provision first")
}
