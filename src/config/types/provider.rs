//! Provider configuration types
//!
//! Configuration for the Azure OpenAI deployment that answers model turns.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Azure OpenAI configuration
    pub azure: Option<AzureOpenAiConfig>,
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Azure OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAiConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Deployment used for agent turns
    #[serde(default = "default_deployment")]
    pub deployment: String,
    /// Smaller deployment for cheap auxiliary calls
    #[serde(default = "default_mini_deployment")]
    pub mini_deployment: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retries on rate limits and transport errors
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl AzureOpenAiConfig {
    /// Create a config for the given endpoint and key with default deployments
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        AzureOpenAiConfig {
            endpoint: endpoint.into(),
            api_key: SecretString::from(api_key.into()),
            api_version: default_api_version(),
            deployment: default_deployment(),
            mini_deployment: default_mini_deployment(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_api_version() -> String {
    "2024-06-01".to_string()
}

fn default_deployment() -> String {
    "gpt-4o".to_string()
}

fn default_mini_deployment() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}
