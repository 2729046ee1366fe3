//! Search tool configuration types

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

/// Tavily web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// API base URL
    #[serde(default = "default_search_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            api_key: default_secret(),
            base_url: default_search_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_search_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Wiki (Confluence) keyword search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Wiki base URL; the wiki tool is unavailable without it
    pub base_url: Option<String>,
    /// Session cookie header copied from a logged-in browser
    #[serde(skip_serializing, default = "default_secret")]
    pub cookies: SecretString,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for WikiConfig {
    fn default() -> Self {
        WikiConfig {
            base_url: None,
            cookies: default_secret(),
            timeout_secs: default_timeout(),
        }
    }
}
