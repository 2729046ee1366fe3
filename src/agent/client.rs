//! Model client
//!
//! `ChatModel` is the seam the graph calls for every model turn;
//! `AzureOpenAiClient` implements it against an Azure OpenAI deployment.

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::agent::types::*;
use crate::config::AzureOpenAiConfig;
use crate::error::{Error, Result};

/// A model that produces the next assistant message for a conversation
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce one assistant message, optionally carrying tool calls.
    ///
    /// Implementations must not mutate shared state before returning, so a
    /// dropped or timed-out call leaves nothing behind.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &GenerationOptions,
    ) -> Result<Message>;
}

/// Azure OpenAI chat-completions client
#[derive(Clone)]
pub struct AzureOpenAiClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: AzureOpenAiConfig,
    /// Deployment this client talks to
    deployment: String,
}

impl AzureOpenAiClient {
    /// Create a client for the configured main deployment
    pub fn new(config: AzureOpenAiConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();

        headers.insert(
            "api-key",
            header::HeaderValue::from_str(config.api_key.expose_secret())
                .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(AzureOpenAiClient {
            client,
            deployment: config.deployment.clone(),
            config,
        })
    }

    /// Same client pointed at the mini deployment
    pub fn mini(&self) -> Self {
        AzureOpenAiClient {
            deployment: self.config.mini_deployment.clone(),
            ..self.clone()
        }
    }

    /// Deployment name used for requests
    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.deployment,
            self.config.api_version
        )
    }

    /// Send a request, retrying rate limits and transport errors
    async fn send_with_retry(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_secs)),
            ..Default::default()
        };
        let max_retries = self.config.max_retries;
        let attempt = &AtomicU32::new(0);

        backoff::future::retry(policy, move || async move {
            let n = attempt.fetch_add(1, Ordering::Relaxed);
            match self.send_request(request).await {
                Ok(response) => Ok(response),
                Err(e) if e.is_retryable() && n < max_retries => {
                    warn!("Model request failed (attempt {}), retrying: {}", n + 1, e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    /// Send a single request to the deployment
    async fn send_request(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        debug!(
            "Sending request to Azure OpenAI: deployment={}, messages={}",
            self.deployment,
            request.messages.len()
        );

        let response = self.client.post(self.completions_url()).json(request).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.json::<ChatCompletionResponse>().await?;

            if let Some(ref usage) = body.usage {
                info!(
                    "Azure OpenAI response: deployment={}, tokens={}",
                    self.deployment, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            match status.as_u16() {
                429 => {
                    warn!("Rate limit exceeded: {}", error_text);
                    Err(Error::RateLimit(error_text))
                }
                401 | 403 => Err(Error::Unauthorized("Invalid Azure OpenAI API key".to_string())),
                _ => Err(Error::Provider(format!("API error ({}): {}", status, error_text))),
            }
        }
    }
}

#[async_trait]
impl ChatModel for AzureOpenAiClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &GenerationOptions,
    ) -> Result<Message> {
        let request = ChatCompletionRequest {
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            tools: (!tools.is_empty()).then(|| tools.to_vec()),
            tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
        };

        let response = self.send_with_retry(&request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("Model returned no choices".to_string()))?;

        debug!(
            "finish_reason={}",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        );

        let mut message = Message::from(choice.message);
        message.role = Role::Assistant;
        Ok(message)
    }
}
