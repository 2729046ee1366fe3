//! Known source directories
//!
//! `saved_paths.json` holds a JSON array of path strings; `last_source.json`
//! holds the last selected source as a JSON string (or `null`).

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::ensure_dir;
use crate::error::Result;

/// The list of source directories the user has picked before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPaths {
    file: PathBuf,
    paths: Vec<String>,
}

impl SavedPaths {
    /// Read the list; a missing file is an empty list
    pub fn load(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let paths: Vec<String> = match std::fs::read_to_string(&file) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded {} saved paths from {}", paths.len(), file.display());
        Ok(SavedPaths { file, paths })
    }

    /// Write the list back to its file
    pub fn save(&self) -> Result<()> {
        write_json(&self.file, &serde_json::to_string(&self.paths)?)
    }

    /// Add a path. Returns false if it was already known.
    pub fn add(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Remove a path. Returns false if it was not known.
    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Last selected source; `None` if the file is missing or holds `null`
pub fn load_last_source(file: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(file) {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remember the selected source (`None` clears it)
pub fn save_last_source(file: &Path, source: Option<&str>) -> Result<()> {
    write_json(file, &serde_json::to_string(&source)?)
}

fn write_json(file: &Path, json: &str) -> Result<()> {
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    std::fs::write(file, json)?;
    Ok(())
}
