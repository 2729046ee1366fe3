//! Tools module - the functions the model can call
//!
//! Each tool is a self-contained module that implements the `Tool` trait.
//! Tools are registered into a `ToolRegistry` and offered to the model for
//! function calling.
//!
//! ## Built-in Tools
//!
//! - **find_definitions**: ctags lookup of class/function/variable definitions
//! - **find_implementations**: ctags lookup of any reference to a symbol
//! - **web_search**: Tavily web search (requires API key)
//! - **intel_wiki_search**: Confluence keyword search (requires wiki base URL)

mod registry;
mod tag_index;
mod traits;
mod web_search;
mod wiki_search;

// Core trait and types
pub use traits::{Tool, ToolCall, ToolOutput};

// Registry
pub use registry::ToolRegistry;

// Built-in tools
pub use tag_index::{
    find_definitions, find_implementations, FindDefinitionsTool, FindImplementationsTool, TagEntry,
    DEFINITION_KINDS,
};
pub use web_search::{SearchResult, WebSearchTool};
pub use wiki_search::{format_wiki_results, WikiPage, WikiSearchTool};

/// Width of the dashed line that closes every search result
pub(crate) const SEPARATOR_WIDTH: usize = 50;

/// Format web search results: URL, content, then a dashed separator
pub(crate) fn format_search_results(results: &[SearchResult]) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut output = String::new();

    for result in results {
        output.push_str(&result.url);
        output.push('\n');
        output.push_str(&result.content);
        output.push('\n');
        output.push_str(&separator);
        output.push_str("\n\n\n");
    }

    output
}
