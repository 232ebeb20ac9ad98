//! Tutor Loop session engine
//!
//! Drives a single-learner tutoring session: builds a curriculum for a topic,
//! teaches each subtopic, evaluates free-text answers and decides whether to
//! advance, under an unreliable text-generation provider.

pub mod config;
pub mod curriculum;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod lesson;
pub mod messages;
pub mod provider;
pub mod question;
pub mod retry;
pub mod sections;
pub mod session;

pub use config::{Config, ProviderConfig, ProviderKind, RetrySettings, MAX_CURRICULUM_SIZE};
pub use curriculum::{build_curriculum, CurriculumRequest, DEFAULT_CURRICULUM_SIZE};
pub use engine::{AnswerOutcome, LessonTurn, SessionEngine, Turn, DEFAULT_USER};
pub use error::{Result, TutorError};
pub use evaluator::{evaluate, Evaluation, MasteryScore, Verdict};
pub use lesson::{build_lesson, Lesson};
pub use provider::{ContentProvider, GeminiProvider, ProviderError, ScriptedProvider};
pub use question::{adaptive_question, build_question, Difficulty, QuestionKind};
pub use retry::{RetryPolicy, RetryingGenerator, Sleeper, TokioSleeper};
pub use sections::{numbered_items, parse_sections, serialize_sections, Sections};
pub use session::{ChatTurn, Role, Session, SessionSnapshot, SessionStatus};
