/*!
 * Pacing, retry and model fallback state for provider calls.
 *
 * `CallState` is an ordinary value owned by one `ContentClient`, so separate
 * runs never share limiter state. Time goes through the `Clock` trait, which
 * lets tests replace real sleeping with `ManualClock`.
 */

use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use rand::Rng;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::AiConfig;

/// Upper bound for the random part of a backoff wait
const MAX_JITTER_MS: u64 = 250;

/// Source of time for pacing and backoff
#[async_trait]
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when slept on; records every sleep
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}

/// Limits applied to every provider call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Minimum gap between the starts of two requests
    pub min_interval: Duration,
    /// Retries after the first attempt
    pub retry_count: u32,
    /// Backoff before the first retry, doubled for each further retry
    pub base_backoff: Duration,
    /// Cap for a single backoff wait
    pub max_backoff: Duration,
    /// Consecutive rate limit rejections before switching to the fallback model
    pub fallback_after: u32,
    /// Consecutive fallback successes before returning to the primary model
    pub reset_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            retry_count: 3,
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            fallback_after: 2,
            reset_after: 5,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            min_interval: config.min_interval(),
            retry_count: config.common.retry_count,
            base_backoff: Duration::from_millis(config.common.retry_backoff_ms),
            max_backoff: Duration::from_millis(config.common.max_backoff_ms),
            fallback_after: config.common.fallback_after,
            reset_after: config.common.reset_after,
        }
    }

    /// Wait before retry number `attempt` (0-based), without jitter.
    ///
    /// `base * 2^attempt`, raised to the server's `Retry-After` hint when
    /// there is one, and never above `max_backoff`.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponential = self.base_backoff.saturating_mul(2u32.saturating_pow(attempt));
        let wait = match retry_after {
            Some(hint) => exponential.max(hint),
            None => exponential,
        };
        wait.min(self.max_backoff)
    }

    /// `backoff` plus a small random jitter, still capped
    pub fn backoff_with_jitter(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let jitter_ceiling = MAX_JITTER_MS.min(self.base_backoff.as_millis() as u64 / 4);
        let jitter = if jitter_ceiling == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ceiling)
        };
        (self.backoff(attempt, retry_after) + Duration::from_millis(jitter)).min(self.max_backoff)
    }
}

/// Mutable limiter and fallback state of one client
#[derive(Debug, Clone, PartialEq)]
pub struct CallState {
    last_call: Option<Instant>,
    primary_model: String,
    fallback_model: Option<String>,
    on_fallback: bool,
    consecutive_rate_limits: u32,
    success_streak: u32,
}

impl CallState {
    pub fn new(primary_model: impl Into<String>, fallback_model: Option<String>) -> Self {
        Self {
            last_call: None,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.filter(|model| !model.is_empty()),
            on_fallback: false,
            consecutive_rate_limits: 0,
            success_streak: 0,
        }
    }

    /// Model the next request should use
    pub fn current_model(&self) -> &str {
        match (&self.fallback_model, self.on_fallback) {
            (Some(fallback), true) => fallback,
            _ => &self.primary_model,
        }
    }

    pub fn is_on_fallback(&self) -> bool {
        self.on_fallback
    }

    pub fn consecutive_rate_limits(&self) -> u32 {
        self.consecutive_rate_limits
    }

    pub fn last_call(&self) -> Option<Instant> {
        self.last_call
    }

    /// How long to wait at `now` before the next request may start
    pub fn wait_needed(&self, now: Instant, min_interval: Duration) -> Duration {
        match self.last_call {
            Some(last) => min_interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub fn mark_call(&mut self, now: Instant) {
        self.last_call = Some(now);
    }

    pub fn record_success(&mut self, reset_after: u32) {
        self.consecutive_rate_limits = 0;
        if !self.on_fallback {
            return;
        }

        self.success_streak += 1;
        if self.success_streak >= reset_after {
            info!(
                "{} successful calls on fallback model, returning to {}",
                self.success_streak, self.primary_model
            );
            self.on_fallback = false;
            self.success_streak = 0;
        }
    }

    /// Returns true when this rejection switched the state to the fallback model
    pub fn record_rate_limit(&mut self, fallback_after: u32) -> bool {
        self.consecutive_rate_limits += 1;
        self.success_streak = 0;

        let Some(fallback) = &self.fallback_model else {
            return false;
        };
        if self.on_fallback || self.consecutive_rate_limits < fallback_after {
            return false;
        }

        warn!(
            "{} consecutive rate limit rejections on {}, switching to fallback model {}",
            self.consecutive_rate_limits, self.primary_model, fallback
        );
        self.on_fallback = true;
        self.consecutive_rate_limits = 0;
        true
    }

    pub fn record_failure(&mut self) {
        self.consecutive_rate_limits = 0;
        self.success_streak = 0;
    }
}
