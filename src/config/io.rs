//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::provider::AzureOpenAiConfig;
use super::types::Config;
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes `.env`)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    // Detect format by extension
    let config: Config = if path.extension().is_some_and(|ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Apply environment variable overrides to an existing config.
///
/// Loads `.env` from the working directory first (the installer writes one
/// there), then overlays any set variables. Env vars have the highest
/// precedence: defaults < file < env.
pub fn apply_env_overrides(config: &mut Config) {
    dotenvy::dotenv().ok();

    // Azure OpenAI
    if let Ok(endpoint) = std::env::var("AZURE_OPENAI_ENDPOINT") {
        let azure = config
            .provider
            .azure
            .get_or_insert_with(|| AzureOpenAiConfig::new(String::new(), String::new()));
        azure.endpoint = endpoint;
    }
    if let Ok(api_key) = std::env::var("AZ_OPENAI_API_KEY") {
        if let Some(ref mut azure) = config.provider.azure {
            azure.api_key = SecretString::from(api_key);
        }
    }
    if let Ok(version) = std::env::var("AZ_OPENAI_API_VERSION") {
        if let Some(ref mut azure) = config.provider.azure {
            azure.api_version = version;
        }
    }
    if let Ok(deployment) = std::env::var("AZ_OPENAI_LLM_4_O") {
        if let Some(ref mut azure) = config.provider.azure {
            azure.deployment = deployment;
        }
    }
    if let Ok(deployment) = std::env::var("AZ_OPENAI_LLM_4_O_MINI") {
        if let Some(ref mut azure) = config.provider.azure {
            azure.mini_deployment = deployment;
        }
    }

    // Web search
    if let Ok(api_key) = std::env::var("TAVILY_API_KEY") {
        config.search.api_key = SecretString::from(api_key);
    }
    if let Ok(url) = std::env::var("TAVILY_BASE_URL") {
        config.search.base_url = url;
    }

    // Wiki search
    if let Ok(url) = std::env::var("WIKI_BASE_URL") {
        config.wiki.base_url = Some(url);
    }
    if let Ok(cookies) = std::env::var("WIKI_COOKIES") {
        config.wiki.cookies = SecretString::from(cookies);
    }

    // Agent limits
    if let Ok(hops) = std::env::var("CODEACE_MAX_HOPS") {
        if let Ok(v) = hops.parse() {
            config.agent.max_hops = v;
        }
    }

    // Storage
    if let Ok(db) = std::env::var("CODEACE_CHECKPOINT_DB") {
        config.storage.checkpoint_db = std::path::PathBuf::from(db);
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let mut config = Config::default();
        config.agent.max_hops = 7;
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.max_hops, 7);
        assert_eq!(loaded.agent.model_timeout, config.agent.model_timeout);
    }

    #[test]
    fn test_load_json5_with_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // azure deployment
                provider: { azure: { endpoint: "https://example.openai.azure.com" } },
                wiki: { base_url: "https://wiki.example.com" },
            }"#,
        )
        .unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        let azure = loaded.provider.azure.unwrap();
        assert_eq!(azure.endpoint, "https://example.openai.azure.com");
        assert_eq!(azure.deployment, "gpt-4o");
        assert_eq!(loaded.wiki.base_url.as_deref(), Some("https://wiki.example.com"));
    }

    #[test]
    fn test_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nmax_hops = 4\nmodel_timeout = \"1m\"\n").unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.agent.max_hops, 4);
        assert_eq!(loaded.agent.model_timeout.as_secs(), 60);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config_from_path(&path), Err(Error::Config(_))));
    }
}
