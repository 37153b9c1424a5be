//! Boilerplate removal for raw document text
//!
//! Each pass is a `&str -> String` function applied in sequence; the number
//! of characters every pass removed is kept for diagnostics. Cleaning that
//! leaves almost nothing of a substantial document is undone.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Cleaned text shorter than this is suspicious when the input was not
pub const MIN_VIABLE_LENGTH: usize = 100;

/// What one cleaning pass removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Name of the pass
    pub pattern: &'static str,
    /// Characters removed by the pass
    pub chars_removed: usize,
}

/// Result of cleaning a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedContent {
    /// Text to extract from
    pub text: String,
    /// Passes that removed something
    pub removals: Vec<Removal>,
    /// True when cleaning was undone by the length guard
    pub reverted: bool,
}

impl CleanedContent {
    /// Total characters removed across passes
    pub fn chars_removed(&self) -> usize {
        self.removals.iter().map(|r| r.chars_removed).sum()
    }
}

static DISCLAIMER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[^\n]*(?:(?:this|the) (?:document|content|page|note) is (?:provided )?for (?:reference|internal use|informational purposes)(?: only)?|do not (?:distribute|forward|reproduce) (?:this|without)|all rights reserved|generated by ai(?:,)? for reference only|disclaimer:)[^\n]*(?:\n|$)",
    )
    .expect("valid regex")
});

static EXPORT_NOTICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[^\n]*(?:cannot be exported|could not be exported|unable to export|export (?:is )?not supported|(?:block|content|embed) (?:type )?is not supported (?:in|for) export)[^\n]*(?:\n|$)",
    )
    .expect("valid regex")
});

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){3,}").expect("valid regex"));

type Pass = fn(&str) -> String;

const PASSES: &[(&str, Pass)] = &[
    ("disclaimer_banner", strip_disclaimers),
    ("export_notice", strip_export_notices),
    ("duplicate_title", strip_duplicate_titles),
    ("blank_line_run", collapse_blank_runs),
];

/// Remove known boilerplate from `raw`
///
/// # Examples
///
/// ```
/// use sift_extractor::preprocess::clean;
///
/// let raw = format!("Intro\n\n\n\n\n{}", "body text ".repeat(20));
/// let cleaned = clean(&raw);
/// assert!(cleaned.text.starts_with("Intro\n\nbody"));
/// ```
pub fn clean(raw: &str) -> CleanedContent {
    let mut text = raw.to_string();
    let mut removals = Vec::new();

    for (name, pass) in PASSES {
        let before = text.chars().count();
        text = pass(&text);
        let removed = before.saturating_sub(text.chars().count());
        if removed > 0 {
            debug!("Preprocess pass '{}' removed {} chars", name, removed);
            removals.push(Removal {
                pattern: name,
                chars_removed: removed,
            });
        }
    }

    let original_len = raw.chars().count();
    let cleaned_len = text.trim().chars().count();
    if cleaned_len < MIN_VIABLE_LENGTH && original_len >= MIN_VIABLE_LENGTH {
        warn!(
            "Cleaning reduced {} chars to {}; keeping original text",
            original_len, cleaned_len
        );
        return CleanedContent {
            text: raw.to_string(),
            removals,
            reverted: true,
        };
    }

    CleanedContent {
        text,
        removals,
        reverted: false,
    }
}

fn strip_disclaimers(text: &str) -> String {
    DISCLAIMER_RE.replace_all(text, "").into_owned()
}

fn strip_export_notices(text: &str) -> String {
    EXPORT_NOTICE_RE.replace_all(text, "").into_owned()
}

/// Drop a short line repeating the previous non-blank line
///
/// Exported documents often carry the title twice (once as metadata, once
/// as a heading); heading markers are ignored when comparing.
fn strip_duplicate_titles(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut previous: Option<&str> = None;

    for line in text.split('\n') {
        let normalized = line.trim().trim_start_matches('#').trim();
        if normalized.is_empty() {
            kept.push(line);
            continue;
        }
        if previous == Some(normalized) && normalized.chars().count() <= 200 {
            // Swallow the blank lines between the two copies as well
            while kept.last().is_some_and(|l| l.trim().is_empty()) {
                kept.pop();
            }
            continue;
        }
        previous = Some(normalized);
        kept.push(line);
    }

    kept.join("\n")
}

fn collapse_blank_runs(text: &str) -> String {
    BLANK_RUN_RE.replace_all(text, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> String {
        "Rust ownership rules prevent data races at compile time. ".repeat(4)
    }

    #[test]
    fn test_strips_disclaimer_banner() {
        let raw = format!(
            "This document is for internal use only.\n{}\nDisclaimer: views are the author's own\n",
            body()
        );
        let cleaned = clean(&raw);
        assert!(!cleaned.text.contains("internal use"));
        assert!(!cleaned.text.contains("Disclaimer"));
        assert!(cleaned.text.contains("ownership"));
        assert_eq!(cleaned.removals[0].pattern, "disclaimer_banner");
        assert!(!cleaned.reverted);
    }

    #[test]
    fn test_strips_export_notice() {
        let raw = format!("{}\n[This embed cannot be exported]\n{}", body(), body());
        let cleaned = clean(&raw);
        assert!(!cleaned.text.contains("exported"));
        assert!(cleaned.removals.iter().any(|r| r.pattern == "export_notice"));
    }

    #[test]
    fn test_strips_duplicate_title() {
        let raw = format!("Memory Safety\n\n# Memory Safety\n{}", body());
        let cleaned = clean(&raw);
        assert_eq!(cleaned.text.matches("Memory Safety").count(), 1);
        assert!(cleaned.text.starts_with("Memory Safety\n"));
    }

    #[test]
    fn test_keeps_repeated_long_paragraphs() {
        let long = "x".repeat(300);
        let raw = format!("{long}\n{long}\n");
        assert_eq!(clean(&raw).text, raw);
    }

    #[test]
    fn test_collapses_blank_runs() {
        let raw = format!("{}\n\n\n\n\n\n{}", body(), body());
        let cleaned = clean(&raw);
        assert!(!cleaned.text.contains("\n\n\n"));
        assert!(cleaned.text.contains("\n\n"));
    }

    #[test]
    fn test_two_blank_lines_are_kept() {
        let raw = format!("{}\n\n\n{}", body(), body());
        assert_eq!(clean(&raw).text, raw);
    }

    #[test]
    fn test_reverts_over_aggressive_cleaning() {
        let raw = "All rights reserved. ".repeat(10);
        let cleaned = clean(&raw);
        assert!(cleaned.reverted);
        assert_eq!(cleaned.text, raw);
        assert!(cleaned.chars_removed() > 0);
    }

    #[test]
    fn test_short_input_is_not_reverted() {
        let cleaned = clean("All rights reserved.\nShort note");
        assert!(!cleaned.reverted);
        assert_eq!(cleaned.text, "Short note");
    }
}
