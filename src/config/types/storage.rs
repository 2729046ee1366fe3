//! Storage configuration types
//!
//! Where checkpoints, conversation history and saved source paths live.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::paths::state_dir;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Checkpoint backend
    #[serde(default)]
    pub checkpoint: CheckpointBackend,
    /// SQLite checkpoint database
    #[serde(default = "default_checkpoint_db")]
    pub checkpoint_db: PathBuf,
    /// Folder for saved conversations
    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,
    /// JSON array of known source directories
    #[serde(default = "default_saved_paths_file")]
    pub saved_paths_file: PathBuf,
    /// JSON string with the last selected source directory
    #[serde(default = "default_last_source_file")]
    pub last_source_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            checkpoint: CheckpointBackend::default(),
            checkpoint_db: default_checkpoint_db(),
            history_dir: default_history_dir(),
            saved_paths_file: default_saved_paths_file(),
            last_source_file: default_last_source_file(),
        }
    }
}

/// Checkpoint backend type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// SQLite file (default, survives restarts)
    #[default]
    Sqlite,
    /// In-memory (lost when the process exits)
    Memory,
}

fn default_checkpoint_db() -> PathBuf {
    state_dir().join("checkpoints.db")
}

fn default_history_dir() -> PathBuf {
    state_dir().join("history")
}

fn default_saved_paths_file() -> PathBuf {
    state_dir().join("saved_paths.json")
}

fn default_last_source_file() -> PathBuf {
    state_dir().join("last_source.json")
}
