//! Agent module - model client, prompts, and the agent/tools graph
//!
//! This module handles all AI-related functionality including:
//! - Azure OpenAI client behind the `ChatModel` trait
//! - The agent/tools graph with its router and hop limit
//! - Checkpoint stores for resumable threads
//! - Prompt templates

mod checkpoint;
mod client;
mod graph;
mod loop_guard;
pub mod prompts;
mod types;

pub use checkpoint::{Checkpoint, Checkpointer, MemoryCheckpointer, SqliteCheckpointer};
pub use client::{AzureOpenAiClient, ChatModel};
pub use graph::{
    close_pending_calls, route, run_tools, AgentGraph, GraphState, Node, RunConfig,
    INTERRUPTED_TOOL_REPLY,
};
pub use loop_guard::LoopGuard;
pub use prompts::{PromptContext, PromptTemplate};
pub use types::*;
