/*!
 * Provider implementations for the language models behind the classifier and rewriter.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API and OpenAI-compatible servers such as LM Studio
 * - Anthropic: Anthropic API integration
 * - Mock: scripted provider for tests
 *
 * Providers make exactly one HTTP attempt per call. Pacing, retries and model
 * fallback live in `service::client`, which owns the shared call state.
 */

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Response;
use std::fmt::Debug;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// A single completion request, independent of the provider's wire format
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier to use for this call
    pub model: String,
    /// System instructions
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the token limit
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Text returned by a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Prompt tokens reported by the provider
    pub prompt_tokens: Option<u64>,
    /// Completion tokens reported by the provider
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably behind the content client.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Build the provider described by `config`
pub fn create_provider(kind: &ProviderKind, config: &ProviderConfig) -> Box<dyn Provider> {
    match kind {
        ProviderKind::Ollama => Box::new(ollama::Ollama::from_config(config)),
        ProviderKind::OpenAI | ProviderKind::LMStudio => Box::new(openai::OpenAI::from_config(config)),
        ProviderKind::Anthropic => Box::new(anthropic::Anthropic::from_config(config)),
    }
}

/// Turn a non-success HTTP response into the matching `ProviderError`
pub(crate) async fn error_for_response(provider: &str, response: Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());

    ProviderError::from_status(status, format!("{} ({}): {}", provider, status, truncate_for_log(&body)), retry_after_secs)
}

/// First 500 characters of a response body, for error messages
pub(crate) fn truncate_for_log(text: &str) -> String {
    if text.chars().count() > 500 {
        text.chars().take(500).collect()
    } else {
        text.to_string()
    }
}

/// Normalize a configured endpoint into a base URL without a trailing slash
pub(crate) fn normalize_endpoint(endpoint: &str, default: &str) -> String {
    let trimmed = endpoint.trim();
    let raw = if trimmed.is_empty() { default } else { trimmed };
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    match url::Url::parse(&with_scheme) {
        Ok(url) => url.as_str().trim_end_matches('/').to_string(),
        Err(_) => default.trim_end_matches('/').to_string(),
    }
}
