//! # CodeAce
//!
//! A code assistant built around a small tool-routing agent graph.
//!
//! ## Features
//!
//! - **Agent graph:** model turns and tool turns alternate until the model stops asking for tools
//! - **ctags lookups:** find where symbols are defined or referenced
//! - **Search tools:** Tavily web search and Confluence wiki search
//! - **Resumable threads:** every completed node is checkpointed (SQLite or in-memory)
//! - **Chat sessions:** saved source directories and conversation history files

pub mod agent;
pub mod config;
pub mod error;
pub mod install;
pub mod session;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
