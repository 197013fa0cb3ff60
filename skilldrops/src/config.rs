//! Runtime configuration.
//!
//! Data directory precedence:
//! 1. SKILLDROPS_DATA_DIR environment variable
//! 2. ~/.config/skilldrops/data (production default)
//! 3. ./data (fallback for development)

use std::path::PathBuf;

const DEFAULT_CONFIG_DIR: &str = ".config/skilldrops/data";
const DEV_DATA_DIR: &str = "./data";

/// Origin the offline cache fetches app-shell resources from.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Root directory for all persisted state.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SKILLDROPS_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// SQLite database file, inside the data directory.
pub fn db_path() -> PathBuf {
    data_dir().join("skilldrops.db")
}

/// Root of the offline cache generations.
pub fn cache_dir() -> PathBuf {
    data_dir().join("cache")
}

/// Root of the file-backed remote document store stand-in.
pub fn remote_dir() -> PathBuf {
    data_dir().join("remote")
}

/// Directory for rolling log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Base URL for network fetches, overridable via SKILLDROPS_BASE_URL.
pub fn base_url() -> String {
    std::env::var("SKILLDROPS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}
