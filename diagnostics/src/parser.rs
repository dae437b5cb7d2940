//! Compiler log to diagnostic entries.
//!
//! Takes the records produced by a compile run (already classified into
//! program output and compiler output), rewrites `<source>:N` references so
//! they point at the user's unmodified text, and drops compiler chatter when
//! the compiler log is hidden. Errors and warnings always survive.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::offset::LineOffset;

/// `<source>:12` inside a gcc diagnostic header.
static SOURCE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<source>:)(\d+)").expect("SOURCE_LINE_RE regex should compile"));

/// `   12 |     code` gutter of a gcc source excerpt.
static EXCERPT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^( +)(\d+)( +\| +)").expect("EXCERPT_LINE_RE regex should compile")
});

static ERROR_OR_WARNING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<source>:\d+:\d+: (?:(?:fatal )?error|warning):")
        .expect("ERROR_OR_WARNING_RE regex should compile")
});

/// A record from a compile run, before line correction and filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrinterRecord {
    /// Output produced by a compile-time print statement.
    Program { message: String, stderr: bool },
    /// A raw line of the compiler's own log.
    Compiler { message: String },
}

impl PrinterRecord {
    pub fn compiler(message: impl Into<String>) -> Self {
        Self::Compiler {
            message: message.into(),
        }
    }

    pub fn program(message: impl Into<String>, stderr: bool) -> Self {
        Self::Program {
            message: message.into(),
            stderr,
        }
    }
}

/// One line of rendered output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub message: String,
    /// Rendered on the error stream (compiler output or `ctp::stderr`).
    pub is_error_output: bool,
    /// Originates from the compiler rather than a print statement.
    pub is_compiler_output: bool,
}

impl DiagnosticEntry {
    /// Entry for a compiler line. Compiler output always counts as error output.
    pub fn compiler(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error_output: true,
            is_compiler_output: true,
        }
    }

    pub fn program(message: impl Into<String>, stderr: bool) -> Self {
        Self {
            message: message.into(),
            is_error_output: stderr,
            is_compiler_output: false,
        }
    }
}

/// Whether a compiler line is a `<source>:L:C: error|warning:` header.
pub fn is_error_or_warning(message: &str) -> bool {
    ERROR_OR_WARNING_RE.is_match(message)
}

/// Rewrite line references in a compiler message through `offset`.
///
/// `<source>:N` references take priority. Only when none is present is the
/// gutter of a source excerpt rewritten, keeping its right alignment.
pub fn correct_line_numbers(offset: LineOffset, message: &str) -> String {
    if offset.is_identity() {
        return message.to_string();
    }

    if SOURCE_LINE_RE.is_match(message) {
        return SOURCE_LINE_RE
            .replace_all(message, |caps: &Captures| match caps[2].parse::<usize>() {
                Ok(line) => format!("{}{}", &caps[1], offset.correct(line)),
                Err(_) => caps[0].to_string(),
            })
            .into_owned();
    }

    EXCERPT_LINE_RE
        .replace(message, |caps: &Captures| match caps[2].parse::<usize>() {
            Ok(line) => {
                let width = caps[1].len() + caps[2].len();
                let corrected = offset.correct(line);
                format!("{corrected:>width$}{}", &caps[3])
            }
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}

/// Turn classified records into diagnostic entries.
///
/// The returned iterator is lazy and single-pass. With `verbose` unset,
/// compiler lines that are not errors or warnings are suppressed.
pub fn parse<I>(
    offset: LineOffset,
    records: I,
    verbose: bool,
) -> impl Iterator<Item = DiagnosticEntry>
where
    I: IntoIterator<Item = PrinterRecord>,
{
    records.into_iter().filter_map(move |record| match record {
        PrinterRecord::Program { message, stderr } => {
            Some(DiagnosticEntry::program(message, stderr))
        }
        PrinterRecord::Compiler { message } => {
            if !verbose && !is_error_or_warning(&message) {
                tracing::trace!(%message, "suppressed compiler line");
                return None;
            }
            Some(DiagnosticEntry::compiler(correct_line_numbers(
                offset, &message,
            )))
        }
    })
}

/// [`parse`] over raw stderr lines, each treated as compiler output.
pub fn parse_log<I>(
    offset: LineOffset,
    lines: I,
    verbose: bool,
) -> impl Iterator<Item = DiagnosticEntry>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    parse(
        offset,
        lines.into_iter().map(PrinterRecord::compiler),
        verbose,
    )
}
