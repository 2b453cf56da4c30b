use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use super::prompts::{self, CLASSIFIER_SYSTEM, REVISER_SYSTEM};
use super::rate_limit::{CallState, Clock, RetryPolicy, TokioClock};
use super::response::{clean_revision, parse_classification, truncate_for_classification};
use super::{Aggression, ContentService};
use crate::app_config::Config;
use crate::bookwash::{Rating, Targets};
use crate::errors::{ProviderError, ServiceError};
use crate::providers::{create_provider, CompletionRequest, Provider};

/// Default character budget for classifier input
pub const DEFAULT_CLASSIFY_CHAR_BUDGET: usize = 12_000;

/// Classifier and rewriter backed by a language model provider.
///
/// Every request waits for the minimum interval since the previous one, then
/// goes to the provider once. Retryable failures are retried with capped
/// exponential backoff; repeated rate limiting moves the client to the
/// fallback model until it has a streak of successes there.
#[derive(Debug)]
pub struct ContentClient {
    provider: Box<dyn Provider>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    state: CallState,
    temperature: Option<f32>,
    classify_char_budget: usize,
}

impl ContentClient {
    pub fn new(provider: Box<dyn Provider>, policy: RetryPolicy, model: impl Into<String>, fallback_model: Option<String>) -> Self {
        Self {
            provider,
            clock: Arc::new(TokioClock),
            policy,
            state: CallState::new(model, fallback_model),
            temperature: None,
            classify_char_budget: DEFAULT_CLASSIFY_CHAR_BUDGET,
        }
    }

    /// Build the client for the active provider of `config`
    pub fn from_config(config: &Config) -> Self {
        let provider_config = config.ai.resolved_provider_config();
        let provider = create_provider(&config.ai.provider, &provider_config);

        Self::new(
            provider,
            RetryPolicy::from_config(&config.ai),
            provider_config.model.clone(),
            config.ai.get_fallback_model(),
        )
        .with_temperature(config.ai.common.temperature)
        .with_classify_char_budget(config.cleaning.classify_char_budget)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_classify_char_budget(mut self, budget: usize) -> Self {
        self.classify_char_budget = budget;
        self
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Run one logical call with pacing, retries and fallback.
    ///
    /// `accept` turns the raw response text into the result; its errors are
    /// retried like provider errors when they are retryable.
    async fn call<T>(
        &mut self,
        system: &str,
        prompt: &str,
        accept: impl Fn(&str) -> Result<T, ProviderError> + Send,
    ) -> Result<T, ProviderError> {
        let mut attempt = 0;

        loop {
            let wait = self.state.wait_needed(self.clock.now(), self.policy.min_interval);
            if !wait.is_zero() {
                debug!("Waiting {:?} before the next {} request", wait, self.provider.name());
                self.clock.sleep(wait).await;
            }
            self.state.mark_call(self.clock.now());

            let mut request = CompletionRequest::new(self.state.current_model(), prompt).system(system);
            if let Some(temperature) = self.temperature {
                request = request.temperature(temperature);
            }

            let result = self
                .provider
                .complete(request)
                .await
                .and_then(|response| accept(&response.text));

            let error = match result {
                Ok(value) => {
                    self.state.record_success(self.policy.reset_after);
                    return Ok(value);
                }
                Err(error) => error,
            };

            let retry_after = match &error {
                ProviderError::RateLimitExceeded { retry_after_secs, .. } => retry_after_secs.map(Duration::from_secs),
                _ => None,
            };
            if error.is_rate_limit() {
                self.state.record_rate_limit(self.policy.fallback_after);
            } else {
                self.state.record_failure();
            }

            if !error.is_retryable() || attempt >= self.policy.retry_count {
                return Err(error);
            }

            let delay = self.policy.backoff_with_jitter(attempt, retry_after);
            attempt += 1;
            warn!(
                "{} request failed (attempt {}/{}): {}. Retrying in {:?}",
                self.provider.name(),
                attempt,
                self.policy.retry_count + 1,
                error,
                delay
            );
            self.clock.sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContentService for ContentClient {
    async fn classify(&mut self, text: &str) -> Result<Rating, ServiceError> {
        let input = truncate_for_classification(text, self.classify_char_budget);
        let prompt = prompts::classification_prompt(&input);

        self.call(CLASSIFIER_SYSTEM, &prompt, parse_classification)
            .await
            .map_err(ServiceError::ClassifierUnavailable)
    }

    async fn revise(&mut self, text: &str, targets: &Targets, aggression: Aggression) -> Result<String, ServiceError> {
        let prompt = prompts::revision_prompt(text, targets, aggression);

        self.call(REVISER_SYSTEM, &prompt, clean_revision)
            .await
            .map_err(ServiceError::ReviserUnavailable)
    }
}
