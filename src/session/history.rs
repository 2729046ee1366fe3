//! Saved conversations
//!
//! A conversation file is a pretty-printed JSON array of `{role, content}`
//! objects, UTF-8 with non-ASCII characters written as-is.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::agent::{Message, Role};
use crate::config::ensure_dir;
use crate::error::{Error, Result};

/// One line of a persisted conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        ChatEntry {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatEntry {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatEntry> for Message {
    fn from(entry: &ChatEntry) -> Self {
        match entry.role {
            Role::System => Message::system(&entry.content),
            Role::User => Message::user(&entry.content),
            // a persisted tool line has lost its call id; replay it as plain text
            Role::Assistant | Role::Tool => Message::assistant(&entry.content),
        }
    }
}

/// `chat_history_<YYYYMMDD>_<HHMMSS>.json`
pub fn default_history_filename(now: DateTime<Local>) -> String {
    format!("chat_history_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Write a conversation into `dir`, creating the folder if needed.
///
/// `filename` must be a bare file name. Returns the full path written.
pub fn save_conversation(dir: &Path, messages: &[ChatEntry], filename: &str) -> Result<PathBuf> {
    if Path::new(filename).file_name().and_then(|n| n.to_str()) != Some(filename) {
        return Err(Error::InvalidInput(format!(
            "Conversation file name must not contain a path: {}",
            filename
        )));
    }

    ensure_dir(dir)?;
    let path = dir.join(filename);
    let json = serde_json::to_string_pretty(messages)?;
    std::fs::write(&path, json)?;

    info!("Saved {} messages to {}", messages.len(), path.display());
    Ok(path)
}

/// Read a conversation written by [`save_conversation`]
pub fn load_conversation(path: &Path) -> Result<Vec<ChatEntry>> {
    let content = std::fs::read_to_string(path)?;
    let messages = serde_json::from_str(&content)?;
    Ok(messages)
}
