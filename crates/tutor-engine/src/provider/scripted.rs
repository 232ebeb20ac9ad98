use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ContentProvider, ProviderError};

/// A provider that replays pre-configured outcomes in order.
///
/// Every prompt is recorded. Once the queue is exhausted each call fails with
/// `RequestFailed`, so an empty `ScriptedProvider` is an always-unavailable
/// provider (used for offline mode).
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ScriptedProvider {
    /// Creates a provider with no queued outcomes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push_response(text);
        self
    }

    /// Queues a failure.
    #[must_use]
    pub fn with_failure(self, error: ProviderError) -> Self {
        self.push_failure(error);
        self
    }

    /// Queues a successful response on a shared provider.
    pub fn push_response(&self, text: impl Into<String>) {
        lock(&self.outcomes).push_back(Ok(text.into()));
    }

    /// Queues a failure on a shared provider.
    pub fn push_failure(&self, error: ProviderError) {
        lock(&self.outcomes).push_back(Err(error));
    }

    /// Number of outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.outcomes).len()
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        lock(&self.prompts).push(prompt.to_string());
        lock(&self.outcomes).pop_front().unwrap_or_else(|| {
            Err(ProviderError::RequestFailed(
                "no scripted responses remaining".to_string(),
            ))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_outcomes_in_order() {
        let provider = ScriptedProvider::new()
            .with_response("First")
            .with_failure(ProviderError::Timeout)
            .with_response("Second");

        assert_eq!(provider.generate("a").await.unwrap(), "First");
        assert_eq!(provider.generate("b").await, Err(ProviderError::Timeout));
        assert_eq!(provider.generate("c").await.unwrap(), "Second");
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_always_fails() {
        let provider = ScriptedProvider::new();
        assert!(provider.generate("a").await.is_err());
        assert!(provider.generate("b").await.is_err());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_records_prompts() {
        let provider = ScriptedProvider::new().with_response("ok");
        provider.push_response("later");

        provider.generate("teach fractions").await.unwrap();
        provider.generate("evaluate").await.unwrap();

        assert_eq!(provider.prompts(), vec!["teach fractions", "evaluate"]);
    }
}
