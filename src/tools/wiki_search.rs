//! Wiki search tool
//!
//! Keyword search against a Confluence wiki, authenticated with a browser
//! session cookie.

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::traits::{parse_arguments, Tool, ToolOutput};
use super::SEPARATOR_WIDTH;
use crate::config::WikiConfig;
use crate::{Error, Result};

/// Results requested per keyword
pub const RESULT_LIMIT: u8 = 5;

#[derive(Debug, Deserialize)]
struct WikiSearchResponse {
    #[serde(default)]
    results: Vec<WikiHit>,
}

#[derive(Debug, Deserialize)]
struct WikiHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

/// A wiki page matching a keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    /// Page title
    pub title: String,
    /// Absolute link to the page
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct WikiSearchArgs {
    key_word: String,
}

/// Wiki keyword search tool
pub struct WikiSearchTool {
    client: Client,
    base_url: Url,
    cookies: SecretString,
}

impl WikiSearchTool {
    /// Create a wiki search tool for the given base URL
    pub fn new(base_url: &str, cookies: SecretString, timeout_secs: u64) -> Result<Self> {
        // Url::join drops the last path segment unless it ends with '/'
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid wiki base URL {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("CodeAce/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            cookies,
        })
    }

    /// Create from config; `None` when no wiki is configured
    pub fn from_config(config: &WikiConfig) -> Result<Option<Self>> {
        match config.base_url {
            Some(ref url) => Self::new(url, config.cookies.clone(), config.timeout_secs).map(Some),
            None => Ok(None),
        }
    }

    /// Search pages by keyword, in the wiki's ranking order
    pub async fn search_by_keyword(&self, key_word: &str, limit: u8) -> Result<Vec<WikiPage>> {
        let mut url = self
            .base_url
            .join("rest/api/search")
            .map_err(|e| Error::Config(format!("Invalid wiki search URL: {}", e)))?;
        let cql = format!("siteSearch ~ \"{}\"", key_word.replace('"', "\\\""));
        url.query_pairs_mut()
            .append_pair("cql", &cql)
            .append_pair("limit", &limit.to_string());

        let mut request = self.client.get(url).header(header::ACCEPT, "application/json");
        let cookies = self.cookies.expose_secret();
        if !cookies.is_empty() {
            request = request.header(header::COOKIE, cookies);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Wiki search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Wiki search failed with status {}: {}",
                status, text
            )));
        }

        let body: WikiSearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse wiki response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .map(|hit| WikiPage {
                url: self.absolute_link(&hit.url),
                title: hit.title,
            })
            .collect())
    }

    fn absolute_link(&self, link: &str) -> String {
        let link = link.trim_start_matches('/');
        self.base_url
            .join(link)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| link.to_string())
    }
}

/// Render wiki hits as numbered blocks separated by a dashed line
pub fn format_wiki_results(pages: &[WikiPage]) -> String {
    let separator = "-".repeat(SEPARATOR_WIDTH);
    let mut answer = String::new();

    for (idx, page) in pages.iter().enumerate() {
        answer.push_str(&format!("Result:\n {}\n", idx + 1));
        answer.push_str(&format!("Title:\n {}\n", page.title));
        answer.push_str(&format!("URL:\n {}\n\n", page.url));
        answer.push_str(&separator);
        answer.push_str("\n\n\n");
    }

    answer
}

#[async_trait]
impl Tool for WikiSearchTool {
    fn name(&self) -> &str {
        "intel_wiki_search"
    }

    fn description(&self) -> &str {
        "Perform a search on the internal wiki using the given keyword. Returns titles and links of matching pages."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "key_word": {
                    "type": "string",
                    "description": "The keyword to search for"
                }
            },
            "required": ["key_word"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let args: WikiSearchArgs = parse_arguments(self.name(), args)?;

        let pages = self.search_by_keyword(&args.key_word, RESULT_LIMIT).await?;
        let answer = format_wiki_results(&pages);

        info!("intel_wiki_search({}) returned {} pages", args.key_word, pages.len());
        debug!("intel_wiki_search({}):\n\n{}", args.key_word, answer);
        Ok(ToolOutput::Text(answer))
    }
}
