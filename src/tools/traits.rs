//! Core tool trait and result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::{FunctionDefinition, ToolDefinition};
use crate::error::Result;

/// A tool that can be called by the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON Schema for tool parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with given arguments
    async fn execute(&self, args: Value) -> Result<ToolOutput>;

    /// Convert to a chat-completions tool definition
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

/// Result of a tool execution.
///
/// Stays typed until it becomes a tool message.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text, passed through unchanged
    Text(String),
    /// Structured data, serialized to JSON text at the message boundary
    Structured(Value),
}

impl ToolOutput {
    /// Create a text result
    pub fn text(content: impl Into<String>) -> Self {
        ToolOutput::Text(content.into())
    }

    /// Create a structured result from anything serializable
    pub fn structured<T: Serialize>(value: &T) -> Result<Self> {
        Ok(ToolOutput::Structured(serde_json::to_value(value)?))
    }

    /// Convert to the text placed in a tool message
    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Text(text) => text,
            // A bare JSON string is still text
            ToolOutput::Structured(Value::String(text)) => text,
            ToolOutput::Structured(value) => value.to_string(),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

/// A tool call request from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool arguments as a JSON object
    pub arguments: Value,
}

impl ToolCall {
    /// Create a tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Parse arguments into a specific type
    pub fn parse_arguments<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        parse_arguments(&self.name, self.arguments.clone())
    }
}

/// Deserialize tool arguments, reporting the tool name on failure
pub(crate) fn parse_arguments<T: for<'de> Deserialize<'de>>(tool: &str, args: Value) -> Result<T> {
    serde_json::from_value(args)
        .map_err(|e| crate::Error::InvalidInput(format!("Invalid arguments for {}: {}", tool, e)))
}
