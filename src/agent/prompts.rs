//! Prompt templates and engineering

use handlebars::Handlebars;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A prompt template using Handlebars syntax
pub struct PromptTemplate {
    /// Template name
    name: String,
    /// Handlebars registry
    registry: Handlebars<'static>,
}

impl PromptTemplate {
    /// Create a new prompt template
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        let name = name.into();
        let mut registry = Handlebars::new();
        // prompts are plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(&name, template)
            .map_err(|e| Error::Internal(format!("Invalid template: {}", e)))?;

        Ok(PromptTemplate { name, registry })
    }

    /// Load a template from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read prompt {}: {}", path.display(), e)))?;
        Self::new("system", &template)
    }

    /// The built-in system prompt, or the one at `path` when given
    pub fn system(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::new("system", DEFAULT_SYSTEM_PROMPT),
        }
    }

    /// Render the template with given data
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.name, data)
            .map_err(|e| Error::Internal(format!("Template render error: {}", e)))
    }
}

/// Values the system prompt is rendered with
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    /// Source tree the user is asking about
    pub source_path: PathBuf,
    /// Second source tree, if selected
    pub extra_source_path: Option<PathBuf>,
    /// ctags file for `source_path`
    pub tags_file: PathBuf,
}

/// Default system prompt for the agent
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are CodeAce, an assistant that answers questions about a source code tree.

## Source
- Source directory: {{source_path}}
{{#if extra_source_path}}
- Additional source directory: {{extra_source_path}}
{{/if}}
- ctags file: {{tags_file}}

## Tools
- `find_definitions`: files where classes, functions or variables are defined. Pass the ctags file above as `tags_file_path`.
- `find_implementations`: any file the ctags file lists for a symbol.
- `web_search`: search the web for documentation and recent information.
- `intel_wiki_search`: search the internal wiki by keyword (if configured).

## Guidelines
1. Look symbols up with the ctags tools before guessing where code lives
2. Cite file paths and URLs from tool results
3. If the tools return nothing useful, say so instead of inventing an answer
"#;
