//! Configuration module
//!
//! - types/mod.rs: Core configuration types (Config, AgentConfig)
//! - types/provider.rs: Azure OpenAI configuration
//! - types/search.rs: Web and wiki search configuration
//! - types/storage.rs: Checkpoint and history locations
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{AgentConfig, Config};

pub use types::provider::{AzureOpenAiConfig, ProviderConfig};

pub use types::search::{SearchConfig, WikiConfig};

pub use types::storage::{CheckpointBackend, StorageConfig};

pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path, ensure_dir, state_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
