//! Cross-Platform Path Utilities
//!
//! Functions for resolving the pipeline's data directories (~/.atelier/).

use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Atelier directory (~/.atelier/)
pub fn atelier_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".atelier"))
}

/// Get the config file path (~/.atelier/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(atelier_dir()?.join("config.json"))
}

/// Get the database file path (~/.atelier/data.db)
pub fn database_path() -> AppResult<PathBuf> {
    Ok(atelier_dir()?.join("data.db"))
}

/// Get the staging directory for acquired images awaiting hand-off
/// (~/.atelier/staging/)
pub fn staging_dir() -> AppResult<PathBuf> {
    Ok(atelier_dir()?.join("staging"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Atelier directory, creating if it doesn't exist
pub fn ensure_atelier_dir() -> AppResult<PathBuf> {
    let path = atelier_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Get the staging directory, creating if it doesn't exist
pub fn ensure_staging_dir() -> AppResult<PathBuf> {
    let path = staging_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
