//! Compile-time printer diagnostics
//!
//! Pure text processing behind the playground output pane:
//! - `offset`: maps line numbers of the compiled text (with the CTP header
//!   inlined) back to the user's text
//! - `parser`: turns a compile run's records into `DiagnosticEntry` values,
//!   correcting line references and hiding compiler chatter on request
//! - `marker`: derives `InlineMarker`s anchored to the current document
//!
//! # Usage
//!
//! ```rust
//! use ctp_diagnostics::{markers, parse_log, Document, LineOffset};
//!
//! let code = "int main(){ return x; }";
//! let log = ["<source>:1:20: error: 'x' was not declared in this scope"];
//! let entries: Vec<_> = parse_log(LineOffset::IDENTITY, log, false).collect();
//! let found = markers(&entries, &Document::new(code));
//! assert_eq!(found.len(), 1);
//! ```

pub mod document;
pub mod marker;
pub mod offset;
pub mod parser;

pub use document::Document;
pub use marker::{markers, InlineMarker, Severity};
pub use offset::LineOffset;
pub use parser::{
    correct_line_numbers, is_error_or_warning, parse, parse_log, DiagnosticEntry, PrinterRecord,
};
