//! The session progression engine.
//!
//! [`SessionEngine`] owns the single live [`Session`] and drives it through
//! the [`SessionStatus`] machine. Each operation computes everything it needs
//! (including any generation call) before touching state, so a rejected
//! operation leaves the session exactly as it was.

use std::sync::Arc;

use tracing::{debug, info, warn};
use tutor_progress::{ProgressEntry, ProgressLog};

use crate::config::Config;
use crate::curriculum::{build_curriculum, CurriculumRequest, DEFAULT_CURRICULUM_SIZE};
use crate::error::{Result, TutorError};
use crate::evaluator::{evaluate, Evaluation};
use crate::lesson::{build_lesson, Lesson};
use crate::messages::{self, Progression};
use crate::provider::ContentProvider;
use crate::question::{adaptive_question, fallback_question};
use crate::retry::RetryingGenerator;
use crate::session::{ChatTurn, Session, SessionSnapshot, SessionStatus};

/// User name recorded in the progress log when none is configured.
pub const DEFAULT_USER: &str = "learner";

// ============================================================================
// Operation results
// ============================================================================

/// Result of an operation that emits one tutor message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Status after the operation.
    pub status: SessionStatus,
    /// Markdown message for the learner.
    pub message: String,
}

/// Result of [`SessionEngine::get_current_lesson`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonTurn {
    /// Status after the operation, always `AwaitingAnswer`.
    pub status: SessionStatus,
    /// The subtopic being taught.
    pub subtopic: String,
    /// The lesson content.
    pub lesson: Lesson,
    /// The question the learner should answer now.
    pub question: String,
    /// Markdown message for the learner.
    pub message: String,
    /// `false` when the cached lesson was returned.
    pub generated: bool,
}

/// Result of [`SessionEngine::submit_answer`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    /// The evaluation of the answer.
    pub evaluation: Evaluation,
    /// Whether the session moved past the subtopic.
    pub advanced: bool,
    /// Status after the operation.
    pub status: SessionStatus,
    /// Index of the current subtopic after the operation.
    pub current_index: usize,
    /// Markdown feedback for the learner.
    pub message: String,
}

// ============================================================================
// SessionEngine
// ============================================================================

/// Drives one tutoring session at a time.
#[derive(Debug)]
pub struct SessionEngine {
    generator: RetryingGenerator,
    curriculum_size: usize,
    user: String,
    progress_log: Option<ProgressLog>,
    idle_status: SessionStatus,
    session: Option<Session>,
    transcript: Vec<ChatTurn>,
}

impl SessionEngine {
    /// Creates an engine with default settings and no progress log.
    #[must_use]
    pub fn new(generator: RetryingGenerator) -> Self {
        Self {
            generator,
            curriculum_size: DEFAULT_CURRICULUM_SIZE,
            user: DEFAULT_USER.to_string(),
            progress_log: None,
            idle_status: SessionStatus::Uninitialized,
            session: None,
            transcript: Vec::new(),
        }
    }

    /// Creates an engine from configuration and a content provider.
    #[must_use]
    pub fn from_config(config: &Config, provider: Arc<dyn ContentProvider>) -> Self {
        Self::new(RetryingGenerator::new(provider, config.retry_policy()))
            .with_curriculum_size(config.curriculum_size)
            .with_user(&config.user)
            .with_progress_log(ProgressLog::new(&config.progress_file))
    }

    /// Sets the number of subtopics per curriculum (at least 1).
    #[must_use]
    pub fn with_curriculum_size(mut self, size: usize) -> Self {
        self.curriculum_size = size.max(1);
        self
    }

    /// Sets the user name recorded in the progress log.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Records completed sessions in `log`.
    #[must_use]
    pub fn with_progress_log(mut self, log: ProgressLog) -> Self {
        self.progress_log = Some(log);
        self
    }

    /// Returns the progress log, if one is attached.
    #[must_use]
    pub const fn progress_log(&self) -> Option<&ProgressLog> {
        self.progress_log.as_ref()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map_or(self.idle_status, |session| session.status)
    }

    /// Returns the live session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn get_state(&self) -> SessionSnapshot {
        self.session
            .as_ref()
            .map_or_else(|| SessionSnapshot::idle(self.idle_status), SessionSnapshot::of)
    }

    /// Returns every message emitted since the session started.
    #[must_use]
    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Loads every session recorded in the attached progress log.
    ///
    /// Returns an empty history when no log is attached or the file does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ProgressLog` if the log cannot be read or decoded.
    pub fn history(&self) -> Result<Vec<ProgressEntry>> {
        match self.progress_log.as_ref() {
            Some(log) => Ok(log.load()?),
            None => Ok(Vec::new()),
        }
    }

    fn live_session(&self, operation: &str) -> Result<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| TutorError::invalid_transition(self.idle_status, operation))
    }

    fn require_status(&self, expected: SessionStatus, operation: &str) -> Result<()> {
        let status = self.status();
        if status == expected {
            Ok(())
        } else {
            debug!(%status, operation, "Rejected operation");
            Err(TutorError::invalid_transition(status, operation))
        }
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Starts a new session, replacing any previous one.
    ///
    /// Allowed from any status. Builds the curriculum (one generation call)
    /// and moves to `Teaching` at the first subtopic.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::EmptyTopic` if `topic` is blank. Nothing is
    /// generated and the previous state is kept.
    pub async fn start(
        &mut self,
        subject: &str,
        level: &str,
        topic: &str,
        prerequisites: &str,
    ) -> Result<Turn> {
        let request = CurriculumRequest::new(subject, level, topic, prerequisites);
        if request.topic.is_empty() {
            return Err(TutorError::EmptyTopic);
        }

        info!(
            subject = %request.subject,
            level = %request.level,
            topic = %request.topic,
            size = self.curriculum_size,
            "Starting session"
        );

        let curriculum = build_curriculum(&self.generator, &request, self.curriculum_size).await;
        let message = messages::intro_message(&request.topic, &curriculum);

        self.session = Some(Session::new(request, curriculum));
        self.transcript = vec![ChatTurn::assistant(message.clone())];

        Ok(Turn {
            status: SessionStatus::Teaching,
            message,
        })
    }

    /// Delivers the lesson for the current subtopic.
    ///
    /// In `Teaching` the lesson is generated, its practice question becomes
    /// the current question and the status moves to `AwaitingAnswer`. In
    /// `AwaitingAnswer` the cached lesson and current question are returned
    /// without generating.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` in any other status.
    pub async fn get_current_lesson(&mut self) -> Result<LessonTurn> {
        const OPERATION: &str = "show a lesson";

        match self.status() {
            SessionStatus::Teaching => self.teach_current_subtopic().await,
            SessionStatus::AwaitingAnswer => self.repeat_current_lesson(OPERATION),
            status => Err(TutorError::invalid_transition(status, OPERATION)),
        }
    }

    async fn teach_current_subtopic(&mut self) -> Result<LessonTurn> {
        const OPERATION: &str = "show a lesson";

        let session = self.live_session(OPERATION)?;
        let subtopic = session
            .current_subtopic()
            .ok_or_else(|| TutorError::invalid_transition(session.status, OPERATION))?
            .to_string();
        let level = session.level.clone();

        let lesson = build_lesson(&self.generator, &subtopic, &level).await;
        let question = lesson.practice_question.clone();
        let message = messages::lesson_message(&subtopic, &lesson);

        if let Some(session) = self.session.as_mut() {
            session.last_question = Some(question.clone());
            session.current_lesson = Some(lesson.clone());
            session.status = SessionStatus::AwaitingAnswer;
            info!(
                subtopic = %subtopic,
                index = session.current_index,
                "Lesson delivered"
            );
        }
        self.transcript.push(ChatTurn::assistant(message.clone()));

        Ok(LessonTurn {
            status: SessionStatus::AwaitingAnswer,
            subtopic,
            lesson,
            question,
            message,
            generated: true,
        })
    }

    fn repeat_current_lesson(&self, operation: &str) -> Result<LessonTurn> {
        let session = self.live_session(operation)?;
        let subtopic = session
            .current_subtopic()
            .ok_or_else(|| TutorError::invalid_transition(session.status, operation))?
            .to_string();
        let lesson = session
            .current_lesson
            .clone()
            .unwrap_or_else(|| Lesson::fallback(&subtopic));
        let question = session
            .last_question
            .clone()
            .unwrap_or_else(|| lesson.practice_question.clone());

        let mut message = messages::lesson_message(&subtopic, &lesson);
        if question != lesson.practice_question {
            message.push('\n');
            message.push_str(&messages::question_message(&question));
        }

        debug!(subtopic = %subtopic, "Returning cached lesson");
        Ok(LessonTurn {
            status: SessionStatus::AwaitingAnswer,
            subtopic,
            lesson,
            question,
            message,
            generated: false,
        })
    }

    /// Evaluates an answer to the current question and advances or stays.
    ///
    /// When the evaluation says to advance, the index increments and the
    /// status becomes `Teaching`, or `Finished` after the last subtopic (a
    /// progress entry is appended then). Otherwise the session stays on the
    /// subtopic and the follow-up question, if any, becomes the current
    /// question.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` unless the status is
    /// `AwaitingAnswer`, and `TutorError::EmptyAnswer` for a blank answer.
    /// Neither generates nor changes state.
    pub async fn submit_answer(&mut self, answer: &str) -> Result<AnswerOutcome> {
        const OPERATION: &str = "submit an answer";

        self.require_status(SessionStatus::AwaitingAnswer, OPERATION)?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(TutorError::EmptyAnswer);
        }

        let session = self.live_session(OPERATION)?;
        let subtopic = session
            .current_subtopic()
            .ok_or_else(|| TutorError::invalid_transition(session.status, OPERATION))?
            .to_string();
        let question = session
            .last_question
            .clone()
            .unwrap_or_else(|| fallback_question(&subtopic));
        let level = session.level.clone();

        let evaluation = evaluate(&self.generator, &question, answer, &subtopic, &level).await;
        let score = evaluation.score();

        let idle_status = self.idle_status;
        let Some(session) = self.session.as_mut() else {
            return Err(TutorError::invalid_transition(idle_status, OPERATION));
        };
        session.scores.push(score);

        let progression = if evaluation.advance {
            session.current_index += 1;
            session.current_lesson = None;
            session.last_question = None;
            match session.current_subtopic().map(str::to_string) {
                Some(next) => {
                    session.status = SessionStatus::Teaching;
                    Progression::Advance { next }
                }
                None => {
                    session.status = SessionStatus::Finished;
                    Progression::Finish {
                        topic: session.topic.clone(),
                        score: session.final_score(),
                    }
                }
            }
        } else {
            let next_question = evaluation
                .followup
                .clone()
                .filter(|followup| !followup.trim().is_empty())
                .unwrap_or(question);
            session.last_question = Some(next_question.clone());
            Progression::Stay {
                question: next_question,
            }
        };

        let status = session.status;
        let current_index = session.current_index;
        info!(
            subtopic = %subtopic,
            verdict = %evaluation.verdict,
            score,
            advanced = evaluation.advance,
            %status,
            "Answer evaluated"
        );

        let completed = if let Progression::Finish { score, .. } = &progression {
            info!(
                topic = %session.topic,
                score = *score,
                answers = session.scores.len(),
                elapsed_secs = session.elapsed().num_seconds(),
                "Session finished"
            );
            Some(ProgressEntry::new(
                self.user.clone(),
                session.subject.clone(),
                session.topic.clone(),
                *score,
            ))
        } else {
            None
        };

        let message = messages::feedback_message(&evaluation, &progression);
        self.transcript.push(ChatTurn::learner(answer));
        self.transcript.push(ChatTurn::assistant(message.clone()));

        if let Some(entry) = completed {
            self.record_progress(entry);
        }

        Ok(AnswerOutcome {
            advanced: evaluation.advance,
            evaluation,
            status,
            current_index,
            message,
        })
    }

    fn record_progress(&self, entry: ProgressEntry) {
        let Some(log) = self.progress_log.as_ref() else {
            return;
        };
        let topic = entry.topic.clone();
        let score = entry.score;
        match log.append(entry) {
            Ok(count) => info!(
                topic = %topic,
                score,
                sessions = count,
                path = %log.path().display(),
                "Session recorded in progress log"
            ),
            Err(e) => warn!(
                error = %e,
                path = %log.path().display(),
                "Failed to record session in progress log"
            ),
        }
    }

    /// Replaces the current question with one adapted to the learner's
    /// average score so far.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` unless the status is
    /// `AwaitingAnswer`.
    pub async fn request_new_question(&mut self) -> Result<Turn> {
        const OPERATION: &str = "request a new question";

        self.require_status(SessionStatus::AwaitingAnswer, OPERATION)?;
        let session = self.live_session(OPERATION)?;
        let subtopic = session
            .current_subtopic()
            .ok_or_else(|| TutorError::invalid_transition(session.status, OPERATION))?
            .to_string();
        let performance = session.performance();

        let question = adaptive_question(&self.generator, &subtopic, performance).await;
        let message = messages::question_message(&question);

        if let Some(session) = self.session.as_mut() {
            session.last_question = Some(question);
        }
        self.transcript.push(ChatTurn::assistant(message.clone()));
        info!(subtopic = %subtopic, performance, "New question issued");

        Ok(Turn {
            status: SessionStatus::AwaitingAnswer,
            message,
        })
    }

    /// Leaves a finished session so a new topic can be chosen.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` unless the status is
    /// `Finished`.
    pub fn choose_new_topic(&mut self) -> Result<SessionStatus> {
        self.require_status(SessionStatus::Finished, "choose a new topic")?;
        self.clear();
        info!("Ready for a new topic");
        Ok(self.idle_status)
    }

    /// Drops the session and transcript. Always succeeds.
    pub fn reset(&mut self) -> SessionStatus {
        let previous = self.status();
        self.clear();
        info!(%previous, "Session reset");
        self.idle_status
    }

    fn clear(&mut self) {
        self.session = None;
        self.transcript.clear();
        self.idle_status = SessionStatus::AwaitingTopicSelection;
    }
}

// ============================================================================
// Tests
// ============================================================================
