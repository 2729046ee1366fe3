//! Configuration validation
//!
//! Validates configuration and reports issues.

use secrecy::ExposeSecret;

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_provider_config(config, result);
    result = validate_agent_config(config, result);
    result = validate_search_config(config, result);

    result
}

fn validate_provider_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    match config.provider.azure {
        None => {
            result = result.with_warning(
                ValidationIssue::new(
                    "provider.azure",
                    "No Azure OpenAI deployment configured. The agent cannot answer questions.",
                )
                .with_suggestion("Set AZURE_OPENAI_ENDPOINT and AZ_OPENAI_API_KEY or run `codeace install`"),
            );
        }
        Some(ref azure) => {
            if azure.endpoint.is_empty() {
                result = result.with_error(ValidationIssue::new(
                    "provider.azure.endpoint",
                    "Azure endpoint is empty",
                ));
            }
            if azure.api_key.expose_secret().is_empty() {
                result = result.with_error(
                    ValidationIssue::new("provider.azure.api_key", "Azure API key is empty")
                        .with_suggestion("Set AZ_OPENAI_API_KEY"),
                );
            }
        }
    }

    result
}

fn validate_agent_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.agent.max_hops == 0 {
        result = result.with_error(
            ValidationIssue::new("agent.max_hops", "max_hops must allow at least one model turn")
                .with_suggestion("Set agent.max_hops to 1 or more"),
        );
    }

    result
}

fn validate_search_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.search.api_key.expose_secret().is_empty() {
        result = result.with_warning(
            ValidationIssue::new("search.api_key", "No Tavily API key; web_search calls will fail")
                .with_suggestion("Set TAVILY_API_KEY"),
        );
    }
    if config.wiki.base_url.is_none() {
        result = result.with_warning(ValidationIssue::new(
            "wiki.base_url",
            "No wiki configured; intel_wiki_search is not registered",
        ));
    }

    result
}
