//! Configuration file helpers for gmail-notifier
//!
//! Locates the notifier's config directory (~/.config/gmail-notifier/) and
//! data directory (~/.local/share/gmail-notifier/), and reads JSON files
//! inside them.
//!
//! Call [`init`] at process startup to bootstrap the config directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory name used under the platform config and data directories
const APP_DIR: &str = "gmail-notifier";

/// Initialize the notifier config directory.
///
/// Creates ~/.config/gmail-notifier/ if it doesn't exist.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the notifier config directory (~/.config/gmail-notifier/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

/// Get the path to a config file within the config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Get the notifier data directory (~/.local/share/gmail-notifier/)
///
/// Holds the state database. Falls back to the config directory on
/// platforms without a separate data directory.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR))
        .or_else(config_dir)
}

/// Get the path to a file within the data directory
pub fn data_path(filename: &str) -> Option<PathBuf> {
    data_dir().map(|p| p.join(filename))
}

/// Load and parse a JSON config file from the config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Check if a config file exists in the config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Ensure the config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    ensure_dir(&dir)?;
    Ok(dir)
}

/// Ensure the directory that will hold `path` exists
///
/// Used for files whose location may be overridden, like the state database.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}
