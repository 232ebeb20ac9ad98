//! Session state types for the tutoring engine.
//!
//! This module defines the session status machine, the session record owned
//! by the engine, the read-only snapshot handed to callers, and transcript
//! turns.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::curriculum::CurriculumRequest;
use crate::lesson::Lesson;

// ============================================================================
// SessionStatus
// ============================================================================

/// Current status of the tutoring session.
///
/// The status transitions through these states:
/// - `Uninitialized` -> `AwaitingTopicSelection` (reset)
/// - any status -> `Teaching` (start)
/// - `Teaching` -> `AwaitingAnswer` (lesson delivered)
/// - From `AwaitingAnswer`:
///   - `Teaching` (answer accepted, more subtopics left)
///   - `Finished` (answer accepted on the last subtopic)
///   - `AwaitingAnswer` (answer not accepted, follow-up asked)
/// - `Finished` -> `AwaitingTopicSelection` (choose a new topic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No session has been set up yet.
    #[default]
    Uninitialized,
    /// Waiting for the learner to pick a topic.
    AwaitingTopicSelection,
    /// A lesson for the current subtopic is due.
    Teaching,
    /// Waiting for the learner's answer to the current question.
    AwaitingAnswer,
    /// Every subtopic has been completed.
    Finished,
}

impl SessionStatus {
    /// Returns `true` if the session is complete.
    ///
    /// # Examples
    ///
    /// ```
    /// use tutor_engine::SessionStatus;
    ///
    /// assert!(SessionStatus::Finished.is_terminal());
    /// assert!(!SessionStatus::Teaching.is_terminal());
    /// ```
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns `true` while a curriculum is being worked through.
    ///
    /// # Examples
    ///
    /// ```
    /// use tutor_engine::SessionStatus;
    ///
    /// assert!(SessionStatus::Teaching.is_active());
    /// assert!(SessionStatus::AwaitingAnswer.is_active());
    /// assert!(!SessionStatus::AwaitingTopicSelection.is_active());
    /// ```
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Teaching | Self::AwaitingAnswer)
    }

    /// Returns the `snake_case` name used in serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingTopicSelection => "awaiting_topic_selection",
            Self::Teaching => "teaching",
            Self::AwaitingAnswer => "awaiting_answer",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Transcript
// ============================================================================

/// Who produced a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The tutor.
    Assistant,
    /// The person studying.
    Learner,
}

/// One message in the session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who said it.
    pub role: Role,
    /// Markdown content.
    pub content: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    /// Creates a tutor turn stamped with the current time.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a learner turn stamped with the current time.
    #[must_use]
    pub fn learner(content: impl Into<String>) -> Self {
        Self::new(Role::Learner, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// The single live tutoring session.
///
/// Created by `start`, mutated only by the engine, dropped by `reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Broad subject area.
    pub subject: String,
    /// Learner level.
    pub level: String,
    /// Requested topic.
    pub topic: String,
    /// Learner background, possibly empty.
    pub prerequisites: String,
    /// Ordered subtopic names. Length is fixed for the session.
    pub curriculum: Vec<String>,
    /// Index of the current subtopic. Equals `curriculum.len()` only when finished.
    pub current_index: usize,
    /// Current status.
    pub status: SessionStatus,
    /// The question the learner is expected to answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_question: Option<String>,
    /// Lesson delivered for the current subtopic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_lesson: Option<Lesson>,
    /// Score of every evaluated answer, in order.
    #[serde(default)]
    pub scores: Vec<u8>,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session in the `Teaching` status at the first subtopic.
    #[must_use]
    pub fn new(request: CurriculumRequest, curriculum: Vec<String>) -> Self {
        let CurriculumRequest {
            subject,
            level,
            topic,
            prerequisites,
        } = request;
        Self {
            subject,
            level,
            topic,
            prerequisites,
            curriculum,
            current_index: 0,
            status: SessionStatus::Teaching,
            last_question: None,
            current_lesson: None,
            scores: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Name of the current subtopic, if the session is not finished.
    #[must_use]
    pub fn current_subtopic(&self) -> Option<&str> {
        self.curriculum.get(self.current_index).map(String::as_str)
    }

    /// Fraction of subtopics completed, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.curriculum.is_empty() {
            return 0.0;
        }
        self.current_index.min(self.curriculum.len()) as f64 / self.curriculum.len() as f64
    }

    /// Mean of all answer scores so far.
    #[must_use]
    pub fn average_score(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        let total: u32 = self.scores.iter().copied().map(u32::from).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.scores.len() as f64;
        Some(f64::from(total) / count)
    }

    /// Average score as a fraction in `[0, 1]`. Zero before any answer.
    #[must_use]
    pub fn performance(&self) -> f64 {
        self.average_score().map_or(0.0, |avg| avg / 100.0)
    }

    /// Final score for the progress log, rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn final_score(&self) -> u8 {
        self.average_score()
            .map_or(0, |avg| avg.round().clamp(0.0, 100.0) as u8)
    }

    /// Returns the duration since the session started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

// ============================================================================
// SessionSnapshot
// ============================================================================

/// Read-only view of the engine state for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Current status.
    pub status: SessionStatus,
    /// Subject of the live session.
    pub subject: Option<String>,
    /// Level of the live session.
    pub level: Option<String>,
    /// Topic of the live session.
    pub topic: Option<String>,
    /// Curriculum of the live session; empty without one.
    pub curriculum: Vec<String>,
    /// Index of the current subtopic.
    pub current_index: usize,
    /// The question awaiting an answer.
    pub last_question: Option<String>,
    /// Fraction of subtopics completed.
    pub progress: f64,
}

impl SessionSnapshot {
    /// Snapshot of a live session.
    #[must_use]
    pub fn of(session: &Session) -> Self {
        Self {
            status: session.status,
            subject: Some(session.subject.clone()),
            level: Some(session.level.clone()),
            topic: Some(session.topic.clone()),
            curriculum: session.curriculum.clone(),
            current_index: session.current_index,
            last_question: session.last_question.clone(),
            progress: session.progress(),
        }
    }

    /// Snapshot when no session exists.
    #[must_use]
    pub const fn idle(status: SessionStatus) -> Self {
        Self {
            status,
            subject: None,
            level: None,
            topic: None,
            curriculum: Vec::new(),
            current_index: 0,
            last_question: None,
            progress: 0.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
