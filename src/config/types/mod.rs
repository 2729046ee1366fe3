//! Configuration types module
//!
//! Splits configuration into the model provider, the search tools and the
//! local storage used for checkpoints and conversation history.

pub mod provider;
pub mod search;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Model provider configuration (Azure OpenAI)
    #[serde(default)]
    pub provider: provider::ProviderConfig,

    /// Web search configuration
    #[serde(default)]
    pub search: search::SearchConfig,

    /// Wiki search configuration
    #[serde(default)]
    pub wiki: search::WikiConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: storage::StorageConfig,
}

impl Config {
    /// Load configuration from environment variables and files
    ///
    /// Layers, lowest precedence first:
    /// 1. Default values
    /// 2. Config file (if present)
    /// 3. `.env` and environment variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Agent-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model turns per run before the graph gives up
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
    /// Upper bound on a single model call
    #[serde(with = "humantime_serde", default = "default_model_timeout")]
    pub model_timeout: Duration,
    /// Sampling temperature for model turns
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Optional file overriding the built-in system prompt template
    pub system_prompt_file: Option<PathBuf>,
    /// Name of the ctags file looked up inside the source directory
    #[serde(default = "default_tags_file")]
    pub tags_file: String,
    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            max_hops: default_max_hops(),
            model_timeout: default_model_timeout(),
            temperature: None,
            system_prompt_file: None,
            tags_file: default_tags_file(),
            verbose: false,
        }
    }
}

fn default_max_hops() -> u32 {
    25
}

fn default_model_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_tags_file() -> String {
    "tags".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agent.max_hops, 25);
        assert_eq!(config.agent.model_timeout, Duration::from_secs(120));
        assert_eq!(config.agent.tags_file, "tags");
        assert!(config.provider.azure.is_none());
    }

    #[test]
    fn test_humantime_timeout_parses() {
        let config: Config =
            serde_json::from_str(r#"{"agent": {"model_timeout": "45s", "max_hops": 3}}"#).unwrap();
        assert_eq!(config.agent.model_timeout, Duration::from_secs(45));
        assert_eq!(config.agent.max_hops, 3);
    }
}
