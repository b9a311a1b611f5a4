//! Platform-specific utilities for cross-platform support

use std::path::PathBuf;

/// Get the platform-specific data directory for storing application data
///
/// Returns:
/// - Windows: %APPDATA%\Punchclock
/// - macOS: ~/Library/Application Support/Punchclock
/// - Linux/Other: ~/.local/share/punchclock
pub fn get_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".data")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("Punchclock")
}

/// Get the platform-specific config directory
pub fn get_config_dir() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(dirs::data_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("Punchclock")
}

/// Get the default terminal database path
pub fn get_default_db_path() -> PathBuf {
    get_data_dir().join("terminal.db")
}

/// Get the default audit log directory
pub fn get_audit_log_dir() -> PathBuf {
    get_config_dir().join("audit")
}

/// Ensure the data directory exists
pub fn ensure_data_dir() -> std::io::Result<PathBuf> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_not_empty() {
        let dir = get_data_dir();
        assert!(dir.to_string_lossy().contains("Punchclock"));
    }

    #[test]
    fn default_db_path_ends_with_db() {
        let path = get_default_db_path();
        assert!(path.to_string_lossy().ends_with("terminal.db"));
    }

    #[test]
    fn audit_dir_under_config() {
        let dir = get_audit_log_dir();
        assert!(dir.to_string_lossy().contains("audit"));
    }
}
