//! Tool registry - manages available tools for the agent

use std::collections::HashMap;

use tracing::info;

use crate::agent::ToolDefinition;
use crate::config::Config;
use crate::error::{Error, Result};

use super::traits::{Tool, ToolCall, ToolOutput};
use super::{FindDefinitionsTool, FindImplementationsTool, WebSearchTool, WikiSearchTool};

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    /// Registry with every built-in tool the config allows.
    ///
    /// The tag lookups and web search are always present; wiki search needs
    /// `wiki.base_url`.
    pub fn builtin(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(FindDefinitionsTool);
        registry.register(FindImplementationsTool);
        registry.register(WebSearchTool::new(config.search.clone())?);
        if let Some(wiki) = WikiSearchTool::from_config(&config.wiki)? {
            registry.register(wiki);
        }
        info!("Registered tools: {}", registry.names().join(", "));
        Ok(registry)
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Result<&dyn Tool> {
        self.tools
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Whether a tool with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool definitions, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        defs
    }

    /// Execute a tool call; an unregistered name is an error
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolOutput> {
        self.get(&call.name)?.execute(call.arguments.clone()).await
    }

    /// Get tool count
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// List tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
