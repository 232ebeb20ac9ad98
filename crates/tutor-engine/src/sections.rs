//! Tolerant parsing of marker-delimited generated text.
//!
//! Generated text is expected to look like:
//!
//! ```text
//! [OBJECTIVES]
//! - Explain what a fraction is
//!
//! [PRACTICE] What is 1/2 + 1/4?
//! ```
//!
//! Nothing here ever fails. Missing markers are absent from the result, and
//! unrecognized markers standing alone on a line close the preceding section
//! without being stored. Bracketed data and markdown links are content.

use std::collections::BTreeMap;
use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::Regex;

/// A marker line: optional markdown decoration, `[LABEL]`, optional inline content.
///
/// Labels are word-like, so `[1, 2, 3]` and `[ ]` are never markers.
static MARKER_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\s*(?:#+\s*)?(?:\*\*)?\[([A-Za-z][A-Za-z0-9 _-]*)\](?:\*\*)?(.*)$").ok()
});

/// A numbered list line: `1. Name`, `2) Name`, `**3.** Name`.
static NUMBERED_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s+)?(?:\*\*)?\d+[.)](?:\*\*)?\s+(.+)$").ok()
});

/// Separators between an item name and its description.
const NAME_SEPARATORS: [&str; 3] = [" - ", " – ", " — "];

/// Parsed sections keyed by normalized label (upper snake case).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    entries: BTreeMap<String, String>,
}

impl Sections {
    /// Creates an empty set of sections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a section, replacing any previous content for the label.
    ///
    /// Blank content is ignored.
    pub fn insert(&mut self, label: &str, content: impl Into<String>) {
        let content = content.into();
        if !content.trim().is_empty() {
            self.entries.insert(normalize_label(label), content);
        }
    }

    /// Returns the content stored for `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(&normalize_label(label)).map(String::as_str)
    }

    /// Returns the content of the first label in `labels` that is present.
    #[must_use]
    pub fn first_of(&self, labels: &[&str]) -> Option<&str> {
        labels.iter().find_map(|label| self.get(label))
    }

    /// Number of stored sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no section was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(label, content)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Normalizes a label to upper snake case: `key-concept ` -> `KEY_CONCEPT`.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Label with every separator removed, used for matching only.
fn compact_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Splits `text` into the sections named by `markers`.
///
/// Matching is case-insensitive and ignores spaces, hyphens and underscores.
/// Content lines are trimmed, runs of blank lines collapse to one, and when a
/// label repeats the later section wins.
#[must_use]
pub fn parse_sections(text: &str, markers: &[&str]) -> Sections {
    let known: Vec<(String, String)> = markers
        .iter()
        .map(|marker| (compact_label(marker), normalize_label(marker)))
        .collect();

    let mut sections = Sections::new();
    let Some(marker_line) = MARKER_LINE.as_ref() else {
        return sections;
    };
    let mut current: Option<String> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        match read_marker(marker_line, line, &known) {
            Some(Marker { label, inline }) => {
                if let Some(previous) = current.take() {
                    sections.insert(&previous, join_lines(&buffer));
                }
                buffer.clear();
                current = label;
                if !inline.is_empty() {
                    buffer.push(inline);
                }
            }
            None if current.is_some() => buffer.push(line),
            None => {}
        }
    }

    if let Some(label) = current {
        sections.insert(&label, join_lines(&buffer));
    }

    sections
}

/// A line that opens a section. `label` is `None` for unrecognized markers.
struct Marker<'a> {
    label: Option<String>,
    inline: &'a str,
}

/// Classifies `line` as a marker line.
///
/// Markdown links (`[text](url)`) are content. A bracketed word that is not a
/// known marker only counts as a marker when it stands alone on its line.
fn read_marker<'a>(
    marker_line: &Regex,
    line: &'a str,
    known: &[(String, String)],
) -> Option<Marker<'a>> {
    let captures = marker_line.captures(line)?;
    let raw_label = captures.get(1)?.as_str();
    let rest = captures.get(2).map_or("", |m| m.as_str());
    if rest.starts_with('(') {
        return None;
    }
    let inline = rest.trim_start().trim_start_matches(':').trim();

    let compact = compact_label(raw_label);
    let label = known
        .iter()
        .find(|(candidate, _)| *candidate == compact)
        .map(|(_, label)| label.clone());

    if label.is_none() && !inline.is_empty() {
        return None;
    }
    Some(Marker { label, inline })
}

/// Trims each line, collapses blank runs and trims the result.
fn join_lines(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines.iter().map(|l| l.trim()) {
        if line.is_empty() && out.last().is_some_and(|prev| prev.is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n").trim().to_string()
}

/// Renders sections back into marker text accepted by [`parse_sections`].
#[must_use]
pub fn serialize_sections(sections: &Sections) -> String {
    let mut out = String::new();
    for (label, content) in sections.iter() {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "[{label}]");
        let _ = writeln!(out, "{content}");
    }
    out
}

/// Extracts item names from numbered list lines.
///
/// Markdown bold is removed and anything after a ` - ` style separator is
/// treated as a description and dropped.
#[must_use]
pub fn numbered_items(text: &str) -> Vec<String> {
    let Some(numbered_line) = NUMBERED_LINE.as_ref() else {
        return Vec::new();
    };
    text.lines()
        .filter_map(|line| numbered_line.captures(line))
        .filter_map(|captures| captures.get(1).map(|m| item_name(m.as_str())))
        .filter(|name| !name.is_empty())
        .collect()
}

fn item_name(raw: &str) -> String {
    let unbolded = raw.replace("**", "");
    let name = NAME_SEPARATORS
        .iter()
        .filter_map(|sep| unbolded.find(sep))
        .min()
        .map_or(unbolded.as_str(), |idx| &unbolded[..idx]);
    name.trim().trim_end_matches(':').trim().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LESSON_MARKERS: [&str; 3] = ["OBJECTIVES", "KEY_CONCEPT", "PRACTICE"];

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("key concept"), "KEY_CONCEPT");
        assert_eq!(normalize_label(" Follow-Up "), "FOLLOW_UP");
        assert_eq!(normalize_label("POINTS  TO__CONSIDER"), "POINTS_TO_CONSIDER");
    }

    #[test]
    fn test_parse_basic_sections() {
        let text = "Intro chatter\n[OBJECTIVES]\n- one\n- two\n\n[PRACTICE]\nWhat is 1/2?\n";
        let sections = parse_sections(text, &LESSON_MARKERS);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections.get("OBJECTIVES"), Some("- one\n- two"));
        assert_eq!(sections.get("practice"), Some("What is 1/2?"));
        assert_eq!(sections.get("KEY_CONCEPT"), None);
    }

    #[test]
    fn test_parse_matches_label_variants() {
        let text = "[Key Concept]\nParts of a whole\n[key-concept]\nNumerators";
        let sections = parse_sections(text, &LESSON_MARKERS);
        // Later duplicate wins.
        assert_eq!(sections.get("KEY_CONCEPT"), Some("Numerators"));

        let sections = parse_sections("[KEYCONCEPT]\nx", &LESSON_MARKERS);
        assert_eq!(sections.get("KEY_CONCEPT"), Some("x"));
    }

    #[test]
    fn test_parse_inline_content() {
        let sections = parse_sections("[PRACTICE] Add 1/3 and 1/6.\nShow your work.", &LESSON_MARKERS);
        assert_eq!(
            sections.get("PRACTICE"),
            Some("Add 1/3 and 1/6.\nShow your work.")
        );
    }

    #[test]
    fn test_parse_markdown_decorated_markers() {
        let text = "## [OBJECTIVES]\nlearn\n**[PRACTICE]**\ntry";
        let sections = parse_sections(text, &LESSON_MARKERS);
        assert_eq!(sections.get("OBJECTIVES"), Some("learn"));
        assert_eq!(sections.get("PRACTICE"), Some("try"));
    }

    #[test]
    fn test_unknown_marker_ends_section() {
        let text = "[OBJECTIVES]\nkeep\n[NOTES]\ndropped\n[PRACTICE]\nq";
        let sections = parse_sections(text, &LESSON_MARKERS);
        assert_eq!(sections.get("OBJECTIVES"), Some("keep"));
        assert_eq!(sections.get("NOTES"), None);
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn test_bracketed_data_is_content() {
        let text = "[KEY_CONCEPT]\nLists hold values.\n[PRACTICE]\n[1, 2, 3]\n[ ]\nWhat is the length of this list?";
        let sections = parse_sections(text, &LESSON_MARKERS);
        assert_eq!(sections.get("KEY_CONCEPT"), Some("Lists hold values."));
        assert_eq!(
            sections.get("PRACTICE"),
            Some("[1, 2, 3]\n[ ]\nWhat is the length of this list?")
        );
    }

    #[test]
    fn test_markdown_link_is_content() {
        let text = "[OBJECTIVES]\nGood start.\n[Khan Academy](https://www.khanacademy.org)\nKeep practicing.";
        let sections = parse_sections(text, &LESSON_MARKERS);
        assert_eq!(
            sections.get("OBJECTIVES"),
            Some("Good start.\n[Khan Academy](https://www.khanacademy.org)\nKeep practicing.")
        );
    }

    #[test]
    fn test_unknown_bracket_with_text_is_content() {
        let text = "[OBJECTIVES]\n[Note] fractions are numbers too\nmore\n[NOTES]\ndropped";
        let sections = parse_sections(text, &LESSON_MARKERS);
        assert_eq!(
            sections.get("OBJECTIVES"),
            Some("[Note] fractions are numbers too\nmore")
        );
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_marker_with_colon_inline() {
        let sections = parse_sections("[PRACTICE]: What is 2/4?", &LESSON_MARKERS);
        assert_eq!(sections.get("PRACTICE"), Some("What is 2/4?"));
    }

    #[test]
    fn test_empty_section_is_absent() {
        let sections = parse_sections("[OBJECTIVES]\n   \n\n[PRACTICE]\nq", &LESSON_MARKERS);
        assert_eq!(sections.get("OBJECTIVES"), None);
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let text = "[OBJECTIVES]\n\n   first  \n\n\n\n  second\n\n";
        let sections = parse_sections(text, &LESSON_MARKERS);
        assert_eq!(sections.get("OBJECTIVES"), Some("first\n\nsecond"));
    }

    #[test]
    fn test_text_without_markers() {
        assert!(parse_sections("Just a paragraph.", &LESSON_MARKERS).is_empty());
        assert!(parse_sections("", &LESSON_MARKERS).is_empty());
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut sections = Sections::new();
        sections.insert("OBJECTIVES", "- one\n- two");
        sections.insert("KEY_CONCEPT", "Parts of a whole\n\nNumerator over denominator");
        sections.insert("PRACTICE", "What is 3/4 of 8?");

        let text = serialize_sections(&sections);
        assert!(text.starts_with("[KEY_CONCEPT]\n"));
        assert_eq!(parse_sections(&text, &LESSON_MARKERS), sections);
    }

    #[test]
    fn test_numbered_items() {
        let text = "Here is the plan:\n\
                    1. Basic Foundations - Understanding core principles\n\
                    2) Key Components – Exploring main elements\n\
                    **3.** **Practical Applications** — Real-world usage\n\
                    - not numbered\n\
                    4. Advanced Concepts\n";
        assert_eq!(
            numbered_items(text),
            vec![
                "Basic Foundations",
                "Key Components",
                "Practical Applications",
                "Advanced Concepts",
            ]
        );
    }

    #[test]
    fn test_numbered_items_keeps_hyphenated_names() {
        assert_eq!(
            numbered_items("1. Mixed-Number Arithmetic - adding wholes"),
            vec!["Mixed-Number Arithmetic"]
        );
    }
}
