//! Content providers: the external text-generation dependency.
//!
//! A provider turns a prompt into free-form text. It is nondeterministic and
//! unreliable: calls may fail, time out or return empty or malformed text.
//! Nothing outside [`crate::retry`] sees a [`ProviderError`].

mod gemini;
mod scripted;

pub use gemini::GeminiProvider;
pub use scripted::ScriptedProvider;

use async_trait::async_trait;

/// Errors a provider can report for a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The request could not be completed.
    #[error("provider request failed: {0}")]
    RequestFailed(String),
    /// The provider rejected the request because of rate limiting.
    #[error("provider rate limited")]
    RateLimited,
    /// The credentials were rejected.
    #[error("provider authentication failed")]
    Authentication,
    /// The call did not finish in time.
    #[error("provider timeout")]
    Timeout,
    /// The provider answered with no text.
    #[error("provider returned an empty response")]
    EmptyResponse,
    /// The provider answered with a body that could not be decoded.
    #[error("provider returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Returns `true` if a retry has a reasonable chance of succeeding.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Authentication)
    }
}

/// The capability to generate text from a prompt.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Human-readable provider name used in logs.
    fn name(&self) -> &str;

    /// Generates text for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}
