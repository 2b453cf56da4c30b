use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{error_for_response, normalize_endpoint, CompletionRequest, CompletionResponse, Provider};
use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Client for OpenAI chat completions and compatible local servers (LM Studio)
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key, empty for local servers
    api_key: String,
    /// Base URL including the version path, e.g. `https://api.openai.com/v1`
    endpoint: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// One chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl From<CompletionRequest> for ChatCompletionRequest {
    fn from(request: CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt,
        });

        Self {
            model: request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl ChatCompletionResponse {
    /// Text of the first choice
    pub fn text(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.message.content.as_str())
    }
}

impl OpenAI {
    pub fn new(api_key: impl Into<String>, endpoint: impl AsRef<str>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: normalize_endpoint(endpoint.as_ref(), DEFAULT_ENDPOINT),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(&config.api_key, &config.endpoint, config.timeout_secs)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    /// Send a chat completion request
    pub async fn chat(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = self.authorized(self.client.post(&url)).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(error_for_response("OpenAI", response).await);
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("chat completion response: {}", e)))
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let response = self.chat(request.into()).await?;
        let text = response
            .text()
            .ok_or_else(|| ProviderError::ParseError("chat completion without choices".to_string()))?
            .to_string();

        Ok(CompletionResponse {
            text,
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/models", self.endpoint);
        let response = self.authorized(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(error_for_response("OpenAI", response).await);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
