//! Configuration paths
//!
//! Utilities for resolving configuration and state file paths.

use std::path::{Path, PathBuf};

/// Get the configuration directory
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CODEACE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .map(|d| d.join("codeace"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".config").join("codeace"))
                .unwrap_or_else(|| PathBuf::from(".codeace"))
        })
}

/// Get the main configuration file path
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CODEACE_CONFIG") {
        return PathBuf::from(path);
    }

    config_dir().join("config.json")
}

/// Get the state directory (checkpoints, history, saved paths)
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CODEACE_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|d| d.join("codeace"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share").join("codeace"))
                .unwrap_or_else(|| PathBuf::from(".codeace"))
        })
}

/// Ensure a directory exists
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let _ = config_dir();
        let _ = state_dir();
        assert!(config_path().file_name().is_some());
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_dir(&nested).unwrap();
    }
}
