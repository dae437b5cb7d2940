//! Read-only line view over the current editor text.

/// Line/column queries over a source text. Lines and columns are 1-based.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Document<'a> {
    pub fn new(text: &'a str) -> Self {
        let lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        Self { lines }
    }

    /// Number of lines. An empty text still has one (empty) line.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, line: usize) -> Option<&'a str> {
        line.checked_sub(1).and_then(|i| self.lines.get(i).copied())
    }

    /// Column of the first non-whitespace character, or 0 for a blank line.
    pub fn first_non_whitespace_column(&self, line: usize) -> usize {
        self.line(line)
            .and_then(|text| text.chars().position(|c| !c.is_whitespace()))
            .map_or(0, |i| i + 1)
    }

    /// Column just past the last non-whitespace character, or 0 for a blank line.
    pub fn last_non_whitespace_column(&self, line: usize) -> usize {
        self.line(line)
            .and_then(|text| {
                let chars: Vec<char> = text.chars().collect();
                chars.iter().rposition(|c| !c.is_whitespace())
            })
            .map_or(0, |i| i + 2)
    }
}
