//! Standalone practice questions, optionally adapted to past performance.

use std::fmt;

use tracing::{debug, warn};

use crate::retry::RetryingGenerator;
use crate::sections::parse_sections;

/// What a question asks the learner to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Explain or reason about an idea.
    Conceptual,
    /// Use an idea in a concrete situation.
    Application,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conceptual => write!(f, "conceptual"),
            Self::Application => write!(f, "application"),
        }
    }
}

/// How hard a question should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    /// For learners still building the basics.
    Foundational,
    /// For learners with a working grasp.
    Moderate,
    /// For learners doing well.
    Challenging,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foundational => write!(f, "foundational"),
            Self::Moderate => write!(f, "moderate"),
            Self::Challenging => write!(f, "challenging"),
        }
    }
}

/// Picks difficulty and kind from performance in `[0, 1]`.
///
/// Out-of-range values are clamped.
#[must_use]
pub fn adapt_to_performance(performance: f64) -> (Difficulty, QuestionKind) {
    let performance = if performance.is_nan() {
        0.0
    } else {
        performance.clamp(0.0, 1.0)
    };

    let difficulty = if performance > 0.8 {
        Difficulty::Challenging
    } else if performance > 0.5 {
        Difficulty::Moderate
    } else {
        Difficulty::Foundational
    };
    let kind = if performance > 0.7 {
        QuestionKind::Application
    } else {
        QuestionKind::Conceptual
    };
    (difficulty, kind)
}

/// Question used when generation is unusable.
#[must_use]
pub fn fallback_question(topic: &str) -> String {
    format!("Explain a key concept of {topic} and provide an example.")
}

/// Builds the generation prompt for a question.
#[must_use]
pub fn question_prompt(topic: &str, level: &str, kind: QuestionKind) -> String {
    format!(
        "Create a thought-provoking {kind} question about {topic} appropriate for {level} level students.

The question should test deep understanding rather than memorization, connect to
real-world applications and require critical thinking.

Format as:
[SCENARIO]
A brief, engaging real-world scenario

[QUESTION]
The specific question to answer

[POINTS TO CONSIDER]
- Key point 1 to address
- Key point 2 to address
- Key point 3 to address"
    )
}

/// Renders generated question text for the learner.
///
/// The question is required. Scenario and points are kept when present.
#[must_use]
pub fn parse_question(text: &str) -> Option<String> {
    let sections = parse_sections(text, &["SCENARIO", "QUESTION", "POINTS_TO_CONSIDER"]);
    let Some(question) = sections.get("QUESTION") else {
        debug!("Generated question has no [QUESTION] section");
        return None;
    };

    let mut parts = Vec::with_capacity(3);
    if let Some(scenario) = sections.get("SCENARIO") {
        parts.push(scenario.to_string());
    }
    parts.push(question.to_string());
    if let Some(points) = sections.get("POINTS_TO_CONSIDER") {
        parts.push(format!("Points to consider:\n{points}"));
    }
    Some(parts.join("\n\n"))
}

/// Produces a practice question about `topic`. Never fails.
pub async fn build_question(
    generator: &RetryingGenerator,
    topic: &str,
    level: &str,
    kind: QuestionKind,
) -> String {
    let generated = generator
        .generate(&question_prompt(topic, level, kind))
        .await
        .and_then(|text| parse_question(&text));

    generated.unwrap_or_else(|| {
        warn!(topic, "Using fallback question");
        fallback_question(topic)
    })
}

/// Produces a question whose difficulty follows `performance` in `[0, 1]`.
pub async fn adaptive_question(
    generator: &RetryingGenerator,
    topic: &str,
    performance: f64,
) -> String {
    let (difficulty, kind) = adapt_to_performance(performance);
    debug!(topic, performance, %difficulty, %kind, "Adapting question");
    build_question(generator, topic, &difficulty.to_string(), kind).await
}
