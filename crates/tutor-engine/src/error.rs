//! Error types for the Tutor Loop engine.
//!
//! Generation failures never show up here: they are absorbed by the retrying
//! generator and the builders' fallbacks. What remains are configuration
//! problems, rejected caller input, invalid state transitions and an
//! unreadable progress log.

use std::path::PathBuf;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Errors that can reach a caller of the engine.
///
/// Variants include actionable suggestions where possible.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your tutor.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Caller Input Errors
    // ========================================================================
    /// A session was started without a topic.
    #[error("A topic is required to start a session\n\nSuggestion: Enter the topic you want to learn, e.g. 'Fractions'")]
    EmptyTopic,

    /// An empty answer was submitted.
    #[error("The answer is empty\n\nSuggestion: Type your answer to the practice question before submitting")]
    EmptyAnswer,

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// The requested operation is not enabled in the current status.
    #[error("Invalid state transition: cannot {operation} while {from}")]
    InvalidStateTransition {
        /// The current status.
        from: String,
        /// The operation that was attempted.
        operation: String,
    },

    // ========================================================================
    // Progress Log Errors
    // ========================================================================
    /// Reading the progress log failed.
    #[error("Progress log error: {0}")]
    ProgressLog(#[from] tutor_progress::ProgressError),
}

impl TutorError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(
        from: impl std::fmt::Display,
        operation: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Returns `true` if the error was caused by rejected caller input.
    ///
    /// Such errors are reported back to the learner and never retried.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyTopic | Self::EmptyAnswer | Self::InvalidStateTransition { .. }
        )
    }
}
