//! Lesson generation for a single subtopic.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::retry::RetryingGenerator;
use crate::sections::{parse_sections, Sections};

const OBJECTIVES: &[&str] = &["OBJECTIVES"];
const INTRODUCTION: &[&str] = &["INTRODUCTION"];
const CORE_CONCEPTS: &[&str] = &[
    "CORE_CONCEPTS",
    "KEY_CONCEPT",
    "KEY_CONCEPTS",
    "CONCEPTS",
    "LESSON",
];
const EXAMPLES: &[&str] = &["EXAMPLES", "EXAMPLE"];
const PRACTICE: &[&str] = &["PRACTICE", "PRACTICE_QUESTION", "QUESTION"];

/// Structured content for one subtopic. Every field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// What the learner should be able to do afterwards.
    pub objectives: String,
    /// Why the subtopic matters.
    pub introduction: String,
    /// The main explanation.
    pub core_concepts: String,
    /// Worked examples.
    pub examples: String,
    /// The question the learner answers next.
    pub practice_question: String,
}

impl Lesson {
    /// Deterministic lesson naming `subtopic`, used when generation is unusable.
    #[must_use]
    pub fn fallback(subtopic: &str) -> Self {
        Self {
            objectives: default_objectives(subtopic),
            introduction: default_introduction(subtopic),
            core_concepts: format!(
                "{subtopic} builds on a few central ideas. Identify the key terms, \
                 what each one means, and how they relate to each other."
            ),
            examples: format!(
                "Think of a situation from everyday life where {subtopic} applies. \
                 Walk through it step by step and note which idea is used at each step."
            ),
            practice_question: format!(
                "In your own words, explain the main idea of {subtopic} and give an example."
            ),
        }
    }
}

fn default_objectives(subtopic: &str) -> String {
    format!(
        "- Describe the main ideas of {subtopic}\n\
         - Apply {subtopic} to a simple example\n\
         - Explain how {subtopic} connects to what you already know"
    )
}

fn default_introduction(subtopic: &str) -> String {
    format!("In this lesson we explore {subtopic} and why it matters.")
}

/// Builds the generation prompt for a lesson on `subtopic`.
#[must_use]
pub fn lesson_prompt(subtopic: &str, level: &str) -> String {
    format!(
        "Create a comprehensive lesson about {subtopic} for {level} level students.

You must format your response with exactly these sections and markers:

[OBJECTIVES]
List exactly three learning objectives.

[INTRODUCTION]
Write 2-3 paragraphs introducing {subtopic}: why it is important, real-world
applications and the connection to previous knowledge.

[CORE_CONCEPTS]
Explain three main concepts, each with key terms, examples and common mistakes.

[EXAMPLES]
A basic example with a step-by-step walkthrough, then an advanced real-world example.

[PRACTICE]
One question that tests understanding of {subtopic}, with the key points a good
answer should address."
    )
}

/// Extracts a lesson from generated text.
///
/// Returns `None` unless core concepts, examples and a practice question are
/// all present. Missing objectives or introduction get defaults naming
/// `subtopic`.
#[must_use]
pub fn parse_lesson(text: &str, subtopic: &str) -> Option<Lesson> {
    let markers: Vec<&str> = [OBJECTIVES, INTRODUCTION, CORE_CONCEPTS, EXAMPLES, PRACTICE]
        .concat();
    let sections = parse_sections(text, &markers);
    lesson_from_sections(&sections, subtopic)
}

fn lesson_from_sections(sections: &Sections, subtopic: &str) -> Option<Lesson> {
    let core_concepts = sections.first_of(CORE_CONCEPTS);
    let examples = sections.first_of(EXAMPLES);
    let practice_question = sections.first_of(PRACTICE);

    let (Some(core_concepts), Some(examples), Some(practice_question)) =
        (core_concepts, examples, practice_question)
    else {
        debug!(
            subtopic,
            core_concepts = core_concepts.is_some(),
            examples = examples.is_some(),
            practice = practice_question.is_some(),
            "Generated lesson is missing mandatory sections"
        );
        return None;
    };

    Some(Lesson {
        objectives: sections
            .first_of(OBJECTIVES)
            .map_or_else(|| default_objectives(subtopic), str::to_string),
        introduction: sections
            .first_of(INTRODUCTION)
            .map_or_else(|| default_introduction(subtopic), str::to_string),
        core_concepts: core_concepts.to_string(),
        examples: examples.to_string(),
        practice_question: practice_question.to_string(),
    })
}

/// Produces a lesson for `subtopic` with every field non-empty.
pub async fn build_lesson(generator: &RetryingGenerator, subtopic: &str, level: &str) -> Lesson {
    let generated = generator
        .generate(&lesson_prompt(subtopic, level))
        .await
        .and_then(|text| parse_lesson(&text, subtopic));

    generated.unwrap_or_else(|| {
        warn!(subtopic, "Using fallback lesson");
        Lesson::fallback(subtopic)
    })
}
