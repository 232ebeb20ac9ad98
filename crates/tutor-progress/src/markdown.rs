//! Markdown rendering of the progress history.
//!
//! This module provides the [`MarkdownGenerator`] struct for turning a list of
//! [`ProgressEntry`] records into a human-readable document with:
//!
//! - A summary table (session count, average and best score)
//! - A chronological table of completed sessions
//! - The latest score for each topic
//!
//! # Example
//!
//! ```rust
//! use tutor_progress::{MarkdownGenerator, ProgressEntry};
//!
//! let entries = vec![ProgressEntry::new("ada", "Mathematics", "Fractions", 80)];
//! let markdown = MarkdownGenerator::new(&entries).generate();
//! assert!(markdown.contains("# Learning Progress"));
//! assert!(markdown.contains("Fractions"));
//! ```

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::{ProgressEntry, ProgressSummary};

/// Generates Markdown documents from a progress history.
pub struct MarkdownGenerator<'a> {
    entries: &'a [ProgressEntry],
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new generator over the given entries.
    #[must_use]
    pub const fn new(entries: &'a [ProgressEntry]) -> Self {
        Self { entries }
    }

    /// Generates the complete Markdown document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "# Learning Progress\n");

        if self.entries.is_empty() {
            let _ = writeln!(output, "_No completed sessions yet._");
            return output;
        }

        let summary = ProgressSummary::from_entries(self.entries);
        Self::write_summary(&mut output, &summary);
        self.write_sessions(&mut output);
        Self::write_latest(&mut output, &summary);

        output
    }

    fn write_summary(output: &mut String, summary: &ProgressSummary) {
        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Sessions | {} |", summary.sessions);
        if let Some(average) = summary.average_score {
            let _ = writeln!(output, "| Average Score | {average:.1} |");
        }
        if let Some(best) = summary.best_score {
            let _ = writeln!(output, "| Best Score | {best} |");
        }
        let _ = writeln!(output);
    }

    fn write_sessions(&self, output: &mut String) {
        let mut sorted: Vec<&ProgressEntry> = self.entries.iter().collect();
        sorted.sort_by_key(|e| e.timestamp);

        let _ = writeln!(output, "## Sessions\n");
        let _ = writeln!(output, "| Date | User | Subject | Topic | Score |");
        let _ = writeln!(output, "|------|------|---------|-------|-------|");
        for entry in sorted {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} |",
                format_timestamp(&entry.timestamp),
                escape_markdown(&entry.user),
                escape_markdown(&entry.subject),
                escape_markdown(&entry.topic),
                entry.score
            );
        }
        let _ = writeln!(output);
    }

    fn write_latest(output: &mut String, summary: &ProgressSummary) {
        let _ = writeln!(output, "## Latest Score by Topic\n");
        for (topic, score) in &summary.latest_by_topic {
            let _ = writeln!(output, "- **{}**: {score}", escape_markdown(topic));
        }
    }
}

/// Formats a timestamp as "YYYY-MM-DD HH:MM UTC".
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Escapes characters that would break a Markdown table cell.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push(' '),
            _ => result.push(ch),
        }
    }

    result
}
