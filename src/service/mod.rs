/*!
 * The classifier/rewriter collaborator.
 *
 * The pipeline only sees the `ContentService` trait: `classify` rates a text on
 * the three axes and `revise` rewrites it towards a set of targets. The real
 * implementation, `ContentClient`, sits on top of any `Provider` and owns the
 * pacing, retry and model fallback state for one run.
 *
 * - `rate_limit`: clock abstraction, retry policy and call state
 * - `client`: the provider-backed service
 * - `prompts`: classifier and rewriter instructions
 * - `response`: parsing and cleanup of model output
 * - `mock`: scripted service for pipeline tests
 */

use async_trait::async_trait;
use std::fmt;

use crate::bookwash::{Rating, Targets};
use crate::errors::ServiceError;

pub mod client;
pub mod mock;
pub mod prompts;
pub mod rate_limit;
pub mod response;

pub use client::ContentClient;
pub use mock::ScriptedService;
pub use rate_limit::{CallState, Clock, ManualClock, RetryPolicy, TokioClock};

/// How much the rewriter may change to reach the targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Aggression {
    /// Replace offending words and phrases only
    Light = 1,
    /// Also rewrite offending sentences and summarise explicit passages
    Moderate = 2,
    /// Remove or neutrally summarise whole offending passages
    Heavy = 3,
}

impl Aggression {
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Levels outside 1..=3 are clamped
    pub fn from_level(level: u32) -> Self {
        match level {
            0 | 1 => Self::Light,
            2 => Self::Moderate,
            _ => Self::Heavy,
        }
    }
}

impl fmt::Display for Aggression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// The two operations the pipeline needs from a language model
#[async_trait]
pub trait ContentService: Send {
    /// Rate `text` on every axis
    async fn classify(&mut self, text: &str) -> Result<Rating, ServiceError>;

    /// Rewrite `text` so that it fits `targets`
    async fn revise(&mut self, text: &str, targets: &Targets, aggression: Aggression) -> Result<String, ServiceError>;
}
