//! Plain-text view for the command line.

use std::fmt::Write as _;
use std::io::Write;

use ctp_diagnostics::InlineMarker;

use crate::controller::{Rendering, View, LOADING_TEXT};
use crate::state::{find_compiler, PlaygroundState};

/// Writes renders to any byte sink, normally stdout.
pub struct TerminalView {
    out: Box<dyn Write + Send>,
    show_markers: bool,
}

impl TerminalView {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            show_markers: true,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn with_markers(mut self, show_markers: bool) -> Self {
        self.show_markers = show_markers;
        self
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
        {
            tracing::warn!(error = %e, "failed to write playground output");
        }
    }
}

impl View for TerminalView {
    fn show_compiling(&mut self) {
        self.emit(&format!("{LOADING_TEXT}\n"));
    }

    fn render(&mut self, rendering: &Rendering) {
        let text = format_rendering(rendering, self.show_markers);
        self.emit(&text);
    }

    fn sync_inputs(&mut self, state: &PlaygroundState) {
        let compiler = find_compiler(&state.compiler).map_or(state.compiler.as_str(), |c| c.name);
        tracing::info!(
            compiler,
            flags = %state.compiler_flags,
            show_compiler_log = state.show_compiler_log,
            "playground inputs"
        );
    }
}

/// Output lines, then one line per marker, then the status.
pub fn format_rendering(rendering: &Rendering, show_markers: bool) -> String {
    let mut text = String::new();
    for entry in &rendering.entries {
        text.push_str(&entry.message);
        if !entry.message.ends_with('\n') {
            text.push('\n');
        }
    }
    if show_markers {
        for marker in &rendering.markers {
            let _ = writeln!(text, "{}", format_marker(marker));
        }
    }
    let _ = writeln!(text, "[{}]", rendering.status);
    text
}

/// e.g. `--> 3:5-14 error: 'x' was not declared in this scope`
pub fn format_marker(marker: &InlineMarker) -> String {
    format!(
        "--> {}:{}-{} {}: {}",
        marker.line, marker.start_col, marker.end_col, marker.severity, marker.message
    )
}
