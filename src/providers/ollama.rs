use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{error_for_response, normalize_endpoint, truncate_for_log, CompletionRequest, CompletionResponse, Provider};
use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Set the token limit
    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).num_predict = Some(num_predict);
        self
    }
}

impl From<CompletionRequest> for GenerationRequest {
    fn from(request: CompletionRequest) -> Self {
        let mut generation = GenerationRequest::new(request.model, request.prompt);
        if let Some(system) = request.system {
            generation = generation.system(system);
        }
        if let Some(temperature) = request.temperature {
            generation = generation.temperature(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            generation = generation.num_predict(max_tokens);
        }
        generation
    }
}

impl Ollama {
    /// Create a new Ollama client for an endpoint such as `localhost:11434`
    pub fn new(endpoint: impl AsRef<str>, timeout_secs: u64) -> Self {
        Self {
            base_url: normalize_endpoint(endpoint.as_ref(), DEFAULT_ENDPOINT),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(&config.endpoint, config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text from the Ollama API
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(error_for_response("Ollama", response).await);
        }

        let body = response.text().await?;
        parse_generation_body(&body)
    }
}

/// Parse a generate response, tolerating streamed JSONL bodies.
///
/// When the server streams despite `stream: false`, every line carries a
/// fragment of the text and the final line has `done: true`.
pub fn parse_generation_body(body: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(response) = serde_json::from_str::<GenerationResponse>(body) {
        return Ok(response);
    }

    debug!("Ollama response is not a single JSON object, trying JSONL");
    let fragments: Vec<GenerationResponse> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<GenerationResponse>(line).ok())
        .collect();

    let Some(last) = fragments.last() else {
        error!("Failed to parse Ollama API response. Raw response: {}", truncate_for_log(body));
        return Err(ProviderError::ParseError(format!(
            "Ollama response contains invalid JSON: {}",
            truncate_for_log(body)
        )));
    };

    Ok(GenerationResponse {
        model: last.model.clone(),
        response: fragments.iter().map(|fragment| fragment.response.as_str()).collect(),
        done: true,
        prompt_eval_count: last.prompt_eval_count,
        eval_count: last.eval_count,
    })
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let response = self.generate(request.into()).await?;
        Ok(CompletionResponse {
            text: response.response,
            prompt_tokens: response.prompt_eval_count,
            completion_tokens: response.eval_count,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(error_for_response("Ollama", response).await);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
