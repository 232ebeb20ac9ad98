//! Tutor Loop Progress Log
//!
//! This crate records completed tutoring sessions. The log is append-only:
//! entries are never mutated after creation, and the whole history is stored
//! as a single JSON array on disk.
//!
//! # Types
//!
//! - [`ProgressEntry`] - One completed session with its score
//! - [`ProgressLog`] - JSON-backed store that loads and appends entries
//! - [`ProgressSummary`] - Aggregate statistics over the history
//! - [`MarkdownGenerator`] - Renders the history for display
//!
//! # Example
//!
//! ```rust,no_run
//! use tutor_progress::{ProgressEntry, ProgressLog};
//!
//! let log = ProgressLog::new(".tutor/progress.json");
//! log.append(ProgressEntry::new("ada", "Mathematics", "Fractions", 80)).unwrap();
//!
//! let history = log.load().unwrap();
//! assert!(!history.is_empty());
//! ```

mod markdown;
mod store;

pub use markdown::MarkdownGenerator;
pub use store::ProgressLog;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest score a session can receive.
pub const MAX_SCORE: u8 = 100;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while reading or writing the progress log.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Failed to serialize the history to JSON.
    #[error("failed to serialize progress history: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write the progress file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The progress file exists but does not contain a valid history.
    #[error("Corrupted progress file '{path}': {message}\n\nSuggestion: Move the file aside to start a fresh history")]
    Corrupted {
        /// Path to the progress file.
        path: PathBuf,
        /// Description of the decode failure.
        message: String,
    },
}

/// Result type for progress log operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

// ============================================================================
// ProgressEntry
// ============================================================================

/// Record of one completed tutoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Name of the learner.
    pub user: String,

    /// Subject area (e.g., "Mathematics").
    pub subject: String,

    /// Topic that was studied (e.g., "Fractions").
    pub topic: String,

    /// Session score in the range 0-100.
    pub score: u8,

    /// When the session was completed.
    pub timestamp: DateTime<Utc>,
}

impl ProgressEntry {
    /// Creates a new entry stamped with the current time.
    ///
    /// Scores above [`MAX_SCORE`] are clamped.
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        subject: impl Into<String>,
        topic: impl Into<String>,
        score: u8,
    ) -> Self {
        Self::with_timestamp(user, subject, topic, score, Utc::now())
    }

    /// Creates a new entry with an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(
        user: impl Into<String>,
        subject: impl Into<String>,
        topic: impl Into<String>,
        score: u8,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user: user.into(),
            subject: subject.into(),
            topic: topic.into(),
            score: score.min(MAX_SCORE),
            timestamp,
        }
    }
}

// ============================================================================
// ProgressSummary
// ============================================================================

/// Aggregate statistics over a progress history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSummary {
    /// Number of completed sessions.
    pub sessions: usize,

    /// Mean score across all sessions, if any.
    pub average_score: Option<f64>,

    /// Highest score recorded, if any.
    pub best_score: Option<u8>,

    /// Most recent score per topic, keyed by topic name.
    pub latest_by_topic: BTreeMap<String, u8>,
}

impl ProgressSummary {
    /// Computes a summary from a slice of entries.
    ///
    /// Entries do not need to be sorted; the latest score per topic is chosen
    /// by timestamp.
    #[must_use]
    pub fn from_entries(entries: &[ProgressEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }

        let total: u32 = entries.iter().map(|e| u32::from(e.score)).sum();
        #[allow(clippy::cast_precision_loss)]
        let average_score = Some(f64::from(total) / entries.len() as f64);
        let best_score = entries.iter().map(|e| e.score).max();

        let mut latest: BTreeMap<String, &ProgressEntry> = BTreeMap::new();
        for entry in entries {
            latest
                .entry(entry.topic.clone())
                .and_modify(|current| {
                    if entry.timestamp >= current.timestamp {
                        *current = entry;
                    }
                })
                .or_insert(entry);
        }

        Self {
            sessions: entries.len(),
            average_score,
            best_score,
            latest_by_topic: latest
                .into_iter()
                .map(|(topic, entry)| (topic, entry.score))
                .collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
