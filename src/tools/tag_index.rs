//! Tag index lookup
//!
//! Maps symbol names to files using a ctags-style index: one entry per line,
//! tab-separated `name<TAB>path<TAB>address<TAB>kind[...]`, where `kind` is a
//! single letter. A symbol may appear on several lines; the last matching
//! line wins.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::traits::{parse_arguments, Tool, ToolOutput};
use crate::error::{Error, Result};

/// Kind letters that count as definitions: class, function, variable
pub const DEFINITION_KINDS: [&str; 3] = ["c", "f", "v"];

/// One parsed line of a tag index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry<'a> {
    /// Symbol name (not unique across the file)
    pub name: &'a str,
    /// File the entry points at
    pub path: &'a str,
    /// Kind letter, when the line has a fourth field
    pub kind: Option<&'a str>,
}

impl<'a> TagEntry<'a> {
    /// Parse one index line. Returns `None` for lines with fewer than two fields.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut parts = line.trim().split('\t');
        let name = parts.next()?;
        let path = parts.next()?;
        let kind = parts.nth(1);
        Some(TagEntry { name, path, kind })
    }

    /// Whether this entry's kind marks a class, function or variable
    pub fn is_definition(&self) -> bool {
        self.kind.is_some_and(|k| DEFINITION_KINDS.contains(&k))
    }
}

/// Files where each symbol is defined.
///
/// Only lines with at least four fields and a definition kind qualify. A
/// missing index file yields an empty map.
pub fn find_definitions<S: AsRef<str>>(symbols: &[S], tags_file: &Path) -> Result<HashMap<String, String>> {
    scan(symbols, tags_file, |entry| entry.is_definition())
}

/// Files that reference each symbol, regardless of kind.
///
/// ctags has no notion of "implementation"; any line naming the symbol is
/// taken as a reference. A missing index file yields an empty map.
pub fn find_implementations<S: AsRef<str>>(symbols: &[S], tags_file: &Path) -> Result<HashMap<String, String>> {
    scan(symbols, tags_file, |_| true)
}

fn scan<S, F>(symbols: &[S], tags_file: &Path, accept: F) -> Result<HashMap<String, String>>
where
    S: AsRef<str>,
    F: Fn(&TagEntry<'_>) -> bool,
{
    let wanted: HashSet<&str> = symbols.iter().map(|s| s.as_ref()).collect();
    let mut found = HashMap::new();

    let file = match std::fs::File::open(tags_file) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("ctags file not found at {}", tags_file.display());
            return Ok(found);
        }
        Err(e) => return Err(e.into()),
    };

    let reader = BufReader::new(file);
    for raw in reader.split(b'\n') {
        let raw = raw?;
        let line = String::from_utf8_lossy(&raw);
        let Some(entry) = TagEntry::parse(&line) else {
            continue;
        };
        if wanted.contains(entry.name) && accept(&entry) {
            found.insert(entry.name.to_string(), entry.path.to_string());
        }
    }

    debug!(
        "Resolved {}/{} symbols from {}",
        found.len(),
        wanted.len(),
        tags_file.display()
    );
    Ok(found)
}

#[derive(Debug, Deserialize)]
struct TagLookupArgs {
    tags_to_find: Vec<String>,
    tags_file_path: PathBuf,
}

fn tag_lookup_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "tags_to_find": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Tag names (symbols) to look up"
            },
            "tags_file_path": {
                "type": "string",
                "description": "Path to the ctags file"
            }
        },
        "required": ["tags_to_find", "tags_file_path"]
    })
}

async fn run_lookup(
    tool: &'static str,
    args: Value,
    lookup: fn(&[String], &Path) -> Result<HashMap<String, String>>,
) -> Result<ToolOutput> {
    let args: TagLookupArgs = parse_arguments(tool, args)?;
    debug!("{}({:?}, {})", tool, args.tags_to_find, args.tags_file_path.display());

    let found = tokio::task::spawn_blocking(move || lookup(&args.tags_to_find, &args.tags_file_path))
        .await
        .map_err(|e| Error::Internal(format!("{} task failed: {}", tool, e)))??;

    ToolOutput::structured(&found)
}

/// Tool wrapper around [`find_definitions`]
pub struct FindDefinitionsTool;

#[async_trait]
impl Tool for FindDefinitionsTool {
    fn name(&self) -> &str {
        "find_definitions"
    }

    fn description(&self) -> &str {
        "Find the files where the given tags (classes, functions, variables) are defined, using a ctags file. \
         Tags that are not found are absent from the result."
    }

    fn parameters_schema(&self) -> Value {
        tag_lookup_schema()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        run_lookup("find_definitions", args, find_definitions::<String>).await
    }
}

/// Tool wrapper around [`find_implementations`]
pub struct FindImplementationsTool;

#[async_trait]
impl Tool for FindImplementationsTool {
    fn name(&self) -> &str {
        "find_implementations"
    }

    fn description(&self) -> &str {
        "Find files where the given tags are likely implemented, i.e. any file the ctags file lists for the tag. \
         Tags that are not found are absent from the result."
    }

    fn parameters_schema(&self) -> Value {
        tag_lookup_schema()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        run_lookup("find_implementations", args, find_implementations::<String>).await
    }
}
