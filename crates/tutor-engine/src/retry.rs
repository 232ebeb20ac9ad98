//! Bounded retries around a [`ContentProvider`].
//!
//! [`RetryingGenerator::generate`] is the only place provider failures are
//! observed. Callers get `Some(text)` or `None`, and treat `None` as "use the
//! fallback".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::provider::{ContentProvider, ProviderError};

/// How many times to call the provider and how long to wait in between.
///
/// Waits grow linearly: after failed attempt `k` (1-based) the generator
/// waits `backoff_base * k` before the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, at least 1.
    pub max_attempts: u32,
    /// Base delay of the linear backoff.
    pub backoff_base: Duration,
    /// Upper bound for a single provider call, if any.
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Creates a policy without a per-call timeout.
    ///
    /// `max_attempts` of zero is treated as one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            call_timeout: None,
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Delay after the failed attempt `attempt` (1-based).
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }

    /// Total time spent sleeping when every attempt fails.
    #[must_use]
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|attempt| self.backoff_for(attempt)).sum()
    }

    /// Upper bound on the time one `generate` call can take, when a call
    /// timeout is set.
    #[must_use]
    pub fn worst_case(&self) -> Option<Duration> {
        self.call_timeout
            .map(|timeout| timeout.saturating_mul(self.max_attempts) + self.total_backoff())
    }
}

/// Waits between attempts. Swapped out in tests for a recording clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Wraps a provider with a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryingGenerator {
    provider: Arc<dyn ContentProvider>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingGenerator")
            .field("provider", &self.provider.name())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryingGenerator {
    /// Creates a generator that sleeps on the tokio timer.
    #[must_use]
    pub fn new(provider: Arc<dyn ContentProvider>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(provider, policy, Arc::new(TokioSleeper))
    }

    /// Creates a generator with a custom sleeper.
    #[must_use]
    pub fn with_sleeper(
        provider: Arc<dyn ContentProvider>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            provider,
            policy,
            sleeper,
        }
    }

    /// Generates text, retrying on any failure.
    ///
    /// Empty or whitespace-only text counts as a failure. Returns `None` once
    /// every attempt has failed; never returns an error.
    pub async fn generate(&self, prompt: &str) -> Option<String> {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = ProviderError::EmptyResponse;

        for attempt in 1..=max_attempts {
            match self.call_once(prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(provider = self.provider.name(), attempt, "Generation succeeded");
                    return Some(text);
                }
                Ok(_) => last_error = ProviderError::EmptyResponse,
                Err(e) => last_error = e,
            }

            debug!(
                provider = self.provider.name(),
                attempt,
                max_attempts,
                error = %last_error,
                transient = last_error.is_transient(),
                "Generation attempt failed"
            );

            if attempt < max_attempts {
                self.sleeper.sleep(self.policy.backoff_for(attempt)).await;
            }
        }

        warn!(
            provider = self.provider.name(),
            attempts = max_attempts,
            error = %last_error,
            "Generation failed after all attempts; using fallback content"
        );
        None
    }

    async fn call_once(&self, prompt: &str) -> Result<String, ProviderError> {
        match self.policy.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.generate(prompt))
                .await
                .unwrap_or(Err(ProviderError::Timeout)),
            None => self.provider.generate(prompt).await,
        }
    }
}
