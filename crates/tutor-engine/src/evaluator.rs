//! Answer evaluation: verdict, feedback and the advance decision.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::retry::RetryingGenerator;
use crate::sections::{parse_sections, Sections};

const VERDICT: &[&str] = &["CORRECT", "CORRECTNESS", "VERDICT", "EVALUATION"];
const UNDERSTANDING: &[&str] = &["CONCEPTUAL_UNDERSTANDING", "UNDERSTANDING"];
const CRITICAL_THINKING: &[&str] = &["CRITICAL_THINKING"];
const FEEDBACK: &[&str] = &["SPECIFIC_FEEDBACK", "FEEDBACK"];
const IMPROVEMENT: &[&str] = &["GROWTH_AREAS", "IMPROVEMENT", "NEXT_STEPS"];
const FOLLOW_UP: &[&str] = &["FOLLOW_UP", "FOLLOWUP", "CHALLENGE"];
const MASTERY: &[&str] = &["MASTERY"];
const ADVANCE: &[&str] = &["MOVE_ON", "ADVANCE"];

/// Mastery ratings range from 1 to 5.
pub const MIN_MASTERY: f64 = 1.0;
/// Highest mastery rating.
pub const MAX_MASTERY: f64 = 5.0;
/// Rating used for a dimension whose score cannot be read.
pub const UNREADABLE_MASTERY: f64 = 3.0;

/// Follow-up question used when evaluation is unusable.
pub const FALLBACK_FOLLOWUP: &str = "Can you expand on your answer and provide a concrete example?";

/// Overall judgement of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The answer shows solid understanding.
    Correct,
    /// The answer is on the right track.
    Partial,
    /// The answer misses the point.
    Incorrect,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => write!(f, "correct"),
            Self::Partial => write!(f, "partial"),
            Self::Incorrect => write!(f, "incorrect"),
        }
    }
}

impl Verdict {
    /// Maps a mean mastery rating to a verdict.
    #[must_use]
    pub fn from_mastery_mean(mean: f64) -> Self {
        if mean >= 4.0 {
            Self::Correct
        } else if mean >= 3.0 {
            Self::Partial
        } else {
            Self::Incorrect
        }
    }

    /// Reads a verdict from free text such as "Yes", "Partially" or "Incorrect".
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        match first_word(text)?.as_str() {
            "yes" | "correct" | "true" | "right" => Some(Self::Correct),
            "partial" | "partially" | "somewhat" => Some(Self::Partial),
            "no" | "incorrect" | "false" | "wrong" => Some(Self::Incorrect),
            _ => None,
        }
    }

    /// Score used when no mastery ratings are available.
    #[must_use]
    pub const fn default_score(self) -> u8 {
        match self {
            Self::Correct => 100,
            Self::Partial => 60,
            Self::Incorrect => 20,
        }
    }
}

/// One rated dimension, e.g. "Critical Thinking: 4" or "Communication: 3.5".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryScore {
    /// Name of the dimension.
    pub dimension: String,
    /// Rating in `1.0..=5.0`.
    pub score: f64,
}

/// The result of evaluating one answer.
///
/// `understanding`, `feedback` and `improvement` may be empty when the
/// generated text left them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    /// Overall judgement.
    pub verdict: Verdict,
    /// What the learner understood.
    pub understanding: String,
    /// Assessment of reasoning, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical_thinking: Option<String>,
    /// Specific feedback on the answer.
    pub feedback: String,
    /// What to work on next.
    pub improvement: String,
    /// Whether the session should move to the next subtopic.
    pub advance: bool,
    /// A question to ask next when staying on the subtopic.
    pub followup: Option<String>,
    /// Per-dimension ratings.
    pub mastery: Vec<MasteryScore>,
}

impl Evaluation {
    /// Conservative evaluation used when generation is unusable.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            verdict: Verdict::Partial,
            understanding: "Your answer shows some understanding of the concepts.".to_string(),
            critical_thinking: None,
            feedback: "Consider providing more specific examples and explaining your reasoning."
                .to_string(),
            improvement:
                "Review the core concepts and try to connect them to real-world applications."
                    .to_string(),
            advance: false,
            followup: Some(FALLBACK_FOLLOWUP.to_string()),
            mastery: Vec::new(),
        }
    }

    /// Mean mastery rating, if any dimension was rated.
    #[must_use]
    pub fn mastery_mean(&self) -> Option<f64> {
        mean(&self.mastery)
    }

    /// Score in `0..=100` for progress tracking.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.mastery_mean()
            .map_or_else(|| self.verdict.default_score(), mastery_percent)
    }
}

/// Scales a mean rating to `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mastery_percent(mean: f64) -> u8 {
    // Clamped first, so the cast cannot truncate.
    (mean / MAX_MASTERY * 100.0).round().clamp(0.0, 100.0) as u8
}

fn mean(scores: &[MasteryScore]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: f64 = scores.iter().map(|s| s.score).sum();
    #[allow(clippy::cast_precision_loss)]
    let count = scores.len() as f64;
    Some(total / count)
}

fn first_word(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_alphabetic())
        .find(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Reads a yes/no answer such as "yes", "No." or "true".
fn yes_no(text: &str) -> Option<bool> {
    match first_word(text)?.as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

/// Parses `Name: score` lines. Scores are clamped to `1..=5`; unreadable
/// scores count as [`UNREADABLE_MASTERY`].
#[must_use]
pub fn parse_mastery(text: &str) -> Vec<MasteryScore> {
    text.lines()
        .filter_map(|line| {
            let (name, value) = line.rsplit_once(':')?;
            if value.trim().is_empty() {
                return None;
            }
            let dimension = name
                .trim()
                .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•') || c.is_whitespace())
                .replace("**", "")
                .trim()
                .to_string();
            if dimension.is_empty() {
                return None;
            }
            Some(MasteryScore {
                dimension,
                score: read_score(value),
            })
        })
        .collect()
}

/// Reads the first number in `value`, decimals included: `4`, `3.5/5`.
fn read_score(value: &str) -> f64 {
    let number = value
        .find(|c: char| c.is_ascii_digit())
        .map_or("", |start| {
            let rest = &value[start..];
            let end = rest
                .find(|c: char| !c.is_ascii_digit() && c != '.')
                .unwrap_or(rest.len());
            rest[..end].trim_end_matches('.')
        });
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map_or(UNREADABLE_MASTERY, |n| n.clamp(MIN_MASTERY, MAX_MASTERY))
}

/// Builds the generation prompt for evaluating `answer`.
#[must_use]
pub fn evaluation_prompt(question: &str, answer: &str, subtopic: &str, level: &str) -> String {
    format!(
        "Evaluate this {level}-level response about {subtopic}.

Question: {question}
Student's Answer: {answer}

Provide a detailed evaluation following this structure:

[CORRECTNESS]
One word: correct, partial or incorrect

[CONCEPTUAL UNDERSTANDING]
Concepts understood correctly, misunderstandings or gaps, depth of understanding

[CRITICAL THINKING]
Logical flow, use of evidence and examples, connections to other concepts

[SPECIFIC FEEDBACK]
Strong aspects, areas needing improvement, concrete ways to strengthen the answer

[GROWTH AREAS]
Topics to review and skills to develop

[FOLLOW-UP]
One follow-up question that builds on what the student showed and addresses the gaps

[MASTERY]
Rate each area 1-5 (5 being highest):
Conceptual Understanding: [1-5]
Application of Knowledge: [1-5]
Critical Thinking: [1-5]
Communication: [1-5]

[MOVE ON]
yes/no (based on overall understanding)"
    )
}

/// Extracts an evaluation from generated text.
///
/// Returns `None` when no recognized section is present.
#[must_use]
pub fn parse_evaluation(text: &str) -> Option<Evaluation> {
    let markers: Vec<&str> = [
        VERDICT,
        UNDERSTANDING,
        CRITICAL_THINKING,
        FEEDBACK,
        IMPROVEMENT,
        FOLLOW_UP,
        MASTERY,
        ADVANCE,
    ]
    .concat();
    let sections = parse_sections(text, &markers);
    if sections.is_empty() {
        debug!("Generated evaluation has no recognized sections");
        return None;
    }
    Some(evaluation_from_sections(&sections))
}

fn evaluation_from_sections(sections: &Sections) -> Evaluation {
    let mastery = sections.first_of(MASTERY).map(parse_mastery).unwrap_or_default();

    let explicit = sections.first_of(VERDICT).and_then(Verdict::from_text);
    let verdict = explicit
        .or_else(|| mean(&mastery).map(Verdict::from_mastery_mean))
        .unwrap_or(Verdict::Partial);

    let advance = sections
        .first_of(ADVANCE)
        .and_then(yes_no)
        .unwrap_or(verdict == Verdict::Correct);

    debug!(
        %verdict,
        explicit = explicit.is_some(),
        dimensions = mastery.len(),
        advance,
        "Parsed evaluation"
    );

    let text = |labels: &[&str]| sections.first_of(labels).unwrap_or_default().to_string();

    Evaluation {
        verdict,
        understanding: text(UNDERSTANDING),
        critical_thinking: sections.first_of(CRITICAL_THINKING).map(str::to_string),
        feedback: text(FEEDBACK),
        improvement: text(IMPROVEMENT),
        advance,
        followup: sections.first_of(FOLLOW_UP).map(str::to_string),
        mastery,
    }
}

/// Evaluates `answer` to `question`. Never fails.
pub async fn evaluate(
    generator: &RetryingGenerator,
    question: &str,
    answer: &str,
    subtopic: &str,
    level: &str,
) -> Evaluation {
    let generated = generator
        .generate(&evaluation_prompt(question, answer, subtopic, level))
        .await
        .and_then(|text| parse_evaluation(&text));

    generated.unwrap_or_else(|| {
        warn!(subtopic, "Using fallback evaluation");
        Evaluation::fallback()
    })
}
