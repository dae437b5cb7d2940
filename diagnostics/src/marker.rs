//! Inline markers derived from compiler diagnostics.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::parser::DiagnosticEntry;

/// `<source>:LINE:COL: SEVERITY: TEXT`
static COMPILER_MESSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<source>:(\d+):(\d+): ((?:fatal )?error|warning):\s+(.+)")
        .expect("COMPILER_MESSAGE_RE regex should compile")
});

/// Marker severity. Only `warning` is below error level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// Map a gcc severity word. `error`, `fatal error` and anything else
    /// that matched the pattern are error level.
    pub fn from_word(word: &str) -> Self {
        if word == "warning" {
            Self::Warning
        } else {
            Self::Error
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// An annotation anchored to one line of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineMarker {
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub severity: Severity,
    /// Severity word as printed by the compiler (`error`, `fatal error`, `warning`).
    pub source: String,
    pub message: String,
}

impl InlineMarker {
    /// Build a marker from one compiler message, if it matches the diagnostic
    /// pattern and its line still exists in `document`.
    pub fn from_message(message: &str, document: &Document<'_>) -> Option<Self> {
        let caps = COMPILER_MESSAGE_RE.captures(message)?;
        let line: usize = caps[1].parse().ok()?;
        if line == 0 || line > document.line_count() {
            tracing::debug!(line, lines = document.line_count(), "stale diagnostic, no marker");
            return None;
        }

        let word = &caps[3];
        Some(Self {
            line,
            start_col: document.first_non_whitespace_column(line),
            end_col: document.last_non_whitespace_column(line),
            severity: Severity::from_word(word),
            source: word.to_string(),
            message: caps[4].trim_end().to_string(),
        })
    }
}

/// Markers for every compiler entry that names a line in `document`.
///
/// Entries that do not match the pattern or point past the end of the
/// document are skipped without error.
pub fn markers<'e, I>(entries: I, document: &Document<'_>) -> Vec<InlineMarker>
where
    I: IntoIterator<Item = &'e DiagnosticEntry>,
{
    entries
        .into_iter()
        .filter(|entry| entry.is_compiler_output)
        .filter_map(|entry| InlineMarker::from_message(&entry.message, document))
        .collect()
}
