//! Curriculum generation: an ordered list of subtopics for a topic.

use tracing::{debug, warn};

use crate::retry::RetryingGenerator;
use crate::sections::numbered_items;

/// Number of subtopics in a curriculum unless configured otherwise.
pub const DEFAULT_CURRICULUM_SIZE: usize = 5;

/// What the learner asked to study.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurriculumRequest {
    /// Broad subject area, e.g. "Mathematics".
    pub subject: String,
    /// Learner level, e.g. "Beginner".
    pub level: String,
    /// The topic to build a curriculum for.
    pub topic: String,
    /// Free-text background, possibly empty.
    pub prerequisites: String,
}

impl CurriculumRequest {
    /// Creates a request, trimming every field.
    #[must_use]
    pub fn new(subject: &str, level: &str, topic: &str, prerequisites: &str) -> Self {
        Self {
            subject: subject.trim().to_string(),
            level: level.trim().to_string(),
            topic: topic.trim().to_string(),
            prerequisites: prerequisites.trim().to_string(),
        }
    }
}

/// Builds the generation prompt for a curriculum of `size` subtopics.
#[must_use]
pub fn curriculum_prompt(request: &CurriculumRequest, size: usize) -> String {
    let CurriculumRequest {
        subject,
        level,
        topic,
        prerequisites,
    } = request;
    let background = if prerequisites.is_empty() {
        "none provided"
    } else {
        prerequisites.as_str()
    };

    format!(
        "Create exactly {size} sequential subtopics for teaching {topic} in {subject} at {level} level.

Format your response EXACTLY like this example:
1. Basic Foundations - Understanding core principles
2. Key Components - Exploring main elements
3. Practical Applications - Real-world usage

Make sure each subtopic:
- Builds progressively on previous knowledge
- Is appropriate for {level} level
- Relates specifically to {topic}
- Has clear learning outcomes

Background context: {background}"
    )
}

/// Extracts exactly `size` subtopic names from generated text.
///
/// Returns `None` when the text does not contain exactly `size` numbered items.
#[must_use]
pub fn parse_curriculum(text: &str, size: usize) -> Option<Vec<String>> {
    let names = numbered_items(text);
    if names.len() == size {
        Some(names)
    } else {
        debug!(expected = size, found = names.len(), "Rejecting generated curriculum");
        None
    }
}

/// Deterministic curriculum used when generation is unusable.
///
/// Five entries follow the fixed progression from "Introduction" to
/// "Mastering". Smaller sizes pick evenly spaced stages; larger sizes insert
/// numbered deep dives before the final stage.
#[must_use]
pub fn fallback_curriculum(topic: &str, size: usize) -> Vec<String> {
    let stages = [
        format!("Introduction to {topic}"),
        format!("Fundamental Concepts of {topic}"),
        format!("Practical Applications of {topic}"),
        format!("Advanced Topics in {topic}"),
        format!("Mastering {topic}"),
    ];
    let last = stages.len() - 1;

    match size {
        0 => Vec::new(),
        1 => vec![stages[0].clone()],
        n if n <= stages.len() => (0..n)
            .map(|i| {
                let idx = (i * last + (n - 1) / 2) / (n - 1);
                stages[idx].clone()
            })
            .collect(),
        n => {
            let mut names: Vec<String> = stages[..last].to_vec();
            names.extend((1..=n - stages.len()).map(|k| format!("Deep Dive {k}: {topic}")));
            names.push(stages[last].clone());
            names
        }
    }
}

/// Produces a curriculum of exactly `size` subtopic names.
///
/// Never fails: unusable or missing generated output falls back to
/// [`fallback_curriculum`].
pub async fn build_curriculum(
    generator: &RetryingGenerator,
    request: &CurriculumRequest,
    size: usize,
) -> Vec<String> {
    let generated = generator
        .generate(&curriculum_prompt(request, size))
        .await
        .and_then(|text| parse_curriculum(&text, size));

    generated.unwrap_or_else(|| {
        warn!(topic = %request.topic, size, "Using fallback curriculum");
        fallback_curriculum(&request.topic, size)
    })
}
