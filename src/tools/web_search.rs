//! Web search tool
//!
//! Web search using the Tavily search API. Requires a Tavily API key.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::format_search_results;
use super::traits::{parse_arguments, Tool, ToolOutput};
use crate::config::SearchConfig;
use crate::{Error, Result};

/// Results requested per query
pub const MAX_RESULTS: u8 = 5;

/// Tavily search request body
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u8,
    search_depth: &'static str,
    include_answer: bool,
    include_raw_content: bool,
    include_images: bool,
}

/// Tavily search response
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// A web search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// URL of the page
    pub url: String,
    /// Extracted content
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
}

/// Tavily web search tool
pub struct WebSearchTool {
    client: Client,
    config: SearchConfig,
}

impl WebSearchTool {
    /// Create a new web search tool
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("CodeAce/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Run a search and return hits in provider order
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let api_key = self.config.api_key.expose_secret();

        let request = TavilyRequest {
            api_key,
            query,
            max_results: MAX_RESULTS,
            search_depth: "advanced",
            include_answer: true,
            include_raw_content: true,
            include_images: true,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Web search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Web search failed with status {}: {}",
                status, text
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse web search response: {}", e)))?;

        Ok(body.results)
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Perform a web search using the given query. Returns the URL and content of each result."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let args: WebSearchArgs = parse_arguments(self.name(), args)?;

        let results = self.search(&args.query).await?;
        let answer = format_search_results(&results);

        info!("web_search({}) returned {} results", args.query, results.len());
        debug!("web_search({}):\n\n{}", args.query, answer);
        Ok(ToolOutput::Text(answer))
    }
}
