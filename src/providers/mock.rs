/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds, echoing the prompt
 * - `MockProvider::scripted()` - Replays a queue of canned results
 * - `MockProvider::intermittent()` - Fails every Nth request
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::rate_limited()` - Answers 429 a fixed number of times, then succeeds
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{CompletionRequest, CompletionResponse, Provider};
use crate::errors::ProviderError;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds, echoing the prompt
    Working,
    /// Pops the next scripted result; echoes once the script runs out
    Scripted,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Rejects the first `times` requests with a rate limit error
    RateLimited { times: usize },
    /// Returns empty response
    Empty,
}

/// Mock provider for testing client behavior without HTTP
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Canned results for `Scripted`
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Replay the given results in order
    pub fn scripted(results: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        let provider = Self::new(MockBehavior::Scripted);
        provider.script.lock().extend(results);
        provider
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn rate_limited(times: usize) -> Self {
        Self::new(MockBehavior::RateLimited { times })
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Models requested, in call order
    pub fn models_used(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.model.clone()).collect()
    }

    /// Copy of every request received
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn respond(text: impl Into<String>, request: &CompletionRequest) -> CompletionResponse {
        let text = text.into();
        CompletionResponse {
            prompt_tokens: Some(request.prompt.len() as u64),
            completion_tokens: Some(text.len() as u64),
            text,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => Ok(Self::respond(request.prompt.clone(), &request)),

            MockBehavior::Scripted => {
                let next = self.script.lock().pop_front();
                match next {
                    Some(Ok(text)) => Ok(Self::respond(text, &request)),
                    Some(Err(error)) => Err(error),
                    None => Ok(Self::respond(request.prompt.clone(), &request)),
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::respond(request.prompt.clone(), &request))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::RateLimited { times } => {
                if count < times {
                    Err(ProviderError::RateLimitExceeded {
                        message: format!("Simulated rate limit (request #{})", count + 1),
                        retry_after_secs: None,
                    })
                } else {
                    Ok(Self::respond(request.prompt.clone(), &request))
                }
            }

            MockBehavior::Empty => Ok(Self::respond(String::new(), &request)),
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection failure".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
