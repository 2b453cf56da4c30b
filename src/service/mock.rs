/*!
 * Scripted content service for pipeline tests.
 *
 * Classifications and revisions are replayed from queues. When a queue runs
 * out, `classify` answers with the fallback rating and `revise` returns its
 * input unchanged. Every call is recorded for later assertions.
 */

use async_trait::async_trait;
use std::collections::VecDeque;

use super::{Aggression, ContentService};
use crate::bookwash::{Rating, Targets};
use crate::errors::{ProviderError, ServiceError};

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    Classify { text: String },
    Revise { text: String, targets: Targets, aggression: Aggression },
}

#[derive(Debug, Default)]
pub struct ScriptedService {
    ratings: VecDeque<Result<Rating, ServiceError>>,
    revisions: VecDeque<Result<String, ServiceError>>,
    fallback_rating: Rating,
    calls: Vec<ServiceCall>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue ratings returned by successive `classify` calls
    pub fn with_ratings(mut self, ratings: impl IntoIterator<Item = Rating>) -> Self {
        self.ratings.extend(ratings.into_iter().map(Ok));
        self
    }

    /// Queue texts returned by successive `revise` calls
    pub fn with_revisions<S: Into<String>>(mut self, revisions: impl IntoIterator<Item = S>) -> Self {
        self.revisions.extend(revisions.into_iter().map(|text| Ok(text.into())));
        self
    }

    /// Rating used once the rating queue is empty
    pub fn with_fallback_rating(mut self, rating: Rating) -> Self {
        self.fallback_rating = rating;
        self
    }

    /// Make the next `classify` call fail
    pub fn fail_next_classify(mut self) -> Self {
        self.ratings.push_back(Err(ServiceError::ClassifierUnavailable(ProviderError::ConnectionError(
            "scripted classifier failure".to_string(),
        ))));
        self
    }

    /// Make the next `revise` call fail
    pub fn fail_next_revise(mut self) -> Self {
        self.revisions.push_back(Err(ServiceError::ReviserUnavailable(ProviderError::ConnectionError(
            "scripted reviser failure".to_string(),
        ))));
        self
    }

    pub fn calls(&self) -> &[ServiceCall] {
        &self.calls
    }

    pub fn classify_count(&self) -> usize {
        self.calls.iter().filter(|call| matches!(call, ServiceCall::Classify { .. })).count()
    }

    /// Aggression of every `revise` call, in order
    pub fn aggression_levels(&self) -> Vec<Aggression> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::Revise { aggression, .. } => Some(*aggression),
                ServiceCall::Classify { .. } => None,
            })
            .collect()
    }

    /// Input text of every `revise` call, in order
    pub fn revised_inputs(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::Revise { text, .. } => Some(text.clone()),
                ServiceCall::Classify { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl ContentService for ScriptedService {
    async fn classify(&mut self, text: &str) -> Result<Rating, ServiceError> {
        self.calls.push(ServiceCall::Classify { text: text.to_string() });
        self.ratings.pop_front().unwrap_or(Ok(self.fallback_rating))
    }

    async fn revise(&mut self, text: &str, targets: &Targets, aggression: Aggression) -> Result<String, ServiceError> {
        self.calls.push(ServiceCall::Revise {
            text: text.to_string(),
            targets: *targets,
            aggression,
        });
        self.revisions.pop_front().unwrap_or_else(|| Ok(text.to_string()))
    }
}
