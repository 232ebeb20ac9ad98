//! Markdown rendering of tutor messages.
//!
//! The engine records these strings in the transcript; presentation layers
//! display them as-is.

use std::fmt::Write;

use crate::evaluator::{Evaluation, Verdict};
use crate::lesson::Lesson;

/// What happens after an answer has been evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progression {
    /// Moving on to the named subtopic.
    Advance {
        /// The next subtopic.
        next: String,
    },
    /// The last subtopic was completed.
    Finish {
        /// Topic of the finished session.
        topic: String,
        /// Final session score in `0..=100`.
        score: u8,
    },
    /// Staying on the current subtopic.
    Stay {
        /// The question to answer next.
        question: String,
    },
}

/// Opening message listing the learning path.
#[must_use]
pub fn intro_message(topic: &str, curriculum: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Let's learn about {topic}!");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Learning Path");
    for (i, name) in curriculum.iter().enumerate() {
        let _ = writeln!(out, "**{}.** {name}", i + 1);
    }
    if let Some(first) = curriculum.first() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Let's start with **{first}**!");
    }
    out
}

/// Full lesson for one subtopic.
#[must_use]
pub fn lesson_message(subtopic: &str, lesson: &Lesson) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {subtopic}");
    for (heading, body) in [
        ("Learning Objectives", &lesson.objectives),
        ("Introduction", &lesson.introduction),
        ("Core Concepts", &lesson.core_concepts),
        ("Examples", &lesson.examples),
        ("Practice Question", &lesson.practice_question),
    ] {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {heading}");
        let _ = writeln!(out, "{body}");
    }
    out
}

fn verdict_headline(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Correct => "Well done, that's correct!",
        Verdict::Partial => "You're on the right track.",
        Verdict::Incorrect => "Not quite yet.",
    }
}

/// Feedback on an evaluated answer, followed by what comes next.
#[must_use]
pub fn feedback_message(evaluation: &Evaluation, progression: &Progression) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "### {}", verdict_headline(evaluation.verdict));

    for (heading, body) in [
        ("Understanding", evaluation.understanding.as_str()),
        (
            "Critical Thinking",
            evaluation.critical_thinking.as_deref().unwrap_or_default(),
        ),
        ("Feedback", evaluation.feedback.as_str()),
        ("Next Steps", evaluation.improvement.as_str()),
    ] {
        if !body.trim().is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "**{heading}**");
            let _ = writeln!(out, "{body}");
        }
    }

    let _ = writeln!(out);
    match progression {
        Progression::Advance { next } => {
            let _ = writeln!(out, "Moving on to **{next}**.");
        }
        Progression::Finish { topic, score } => {
            out.push_str(&completion_message(topic, *score));
        }
        Progression::Stay { question } => {
            let _ = writeln!(out, "**Try this next:**");
            let _ = writeln!(out, "{question}");
        }
    }
    out
}

/// Announcement that every subtopic is complete.
#[must_use]
pub fn completion_message(topic: &str, score: u8) -> String {
    format!(
        "Congratulations! You've completed all topics in **{topic}** with an average score of {score}/100.\n"
    )
}

/// A replacement practice question.
#[must_use]
pub fn question_message(question: &str) -> String {
    format!("### New Question\n\n{question}\n")
}
