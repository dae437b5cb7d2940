//! Line-offset bookkeeping for inlined headers.
//!
//! The playground replaces the `#include <ctp/ctp.hpp>` directive with the
//! header text before compiling, so every line after the directive is shifted
//! by the number of newlines in the header. `LineOffset` maps line numbers in
//! the compiled text back to the text the user actually sees.
//!
//! ```text
//!  compiled                       user-visible
//!  1 .. include_line          ->  unchanged
//!  include_line+1 .. +header  ->  include_line   (inside the header)
//!  beyond                     ->  line - header_lines
//! ```

use serde::{Deserialize, Serialize};

/// Number of header lines inserted and the 1-based line of the include.
///
/// Serialises as a `[header_lines, include_line]` pair so it can travel to a
/// remote parse service unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct LineOffset {
    /// Newlines contributed by the inlined header text.
    pub header_lines: usize,
    /// Line on which the include directive appeared (0 = not found).
    pub include_line: usize,
}

impl LineOffset {
    /// Offset used when no include directive was found.
    pub const IDENTITY: Self = Self {
        header_lines: 0,
        include_line: 0,
    };

    pub fn new(header_lines: usize, include_line: usize) -> Self {
        Self {
            header_lines,
            include_line,
        }
    }

    pub fn is_identity(self) -> bool {
        self.header_lines == 0
    }

    /// Map a line number of the compiled text to the user-visible line.
    pub fn correct(self, line: usize) -> usize {
        if line <= self.include_line {
            line
        } else if line <= self.include_line + self.header_lines {
            self.include_line
        } else {
            line - self.header_lines
        }
    }
}

impl From<(usize, usize)> for LineOffset {
    fn from((header_lines, include_line): (usize, usize)) -> Self {
        Self::new(header_lines, include_line)
    }
}

impl From<LineOffset> for (usize, usize) {
    fn from(offset: LineOffset) -> Self {
        (offset.header_lines, offset.include_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_after_header_are_shifted() {
        let offset = LineOffset::new(5, 3);
        assert_eq!(offset.correct(10), 5);
        assert_eq!(offset.correct(9), 4);
    }

    #[test]
    fn test_lines_before_include_are_unchanged() {
        let offset = LineOffset::new(5, 3);
        assert_eq!(offset.correct(1), 1);
        assert_eq!(offset.correct(2), 2);
        assert_eq!(offset.correct(3), 3);
    }

    #[test]
    fn test_lines_inside_header_map_to_include() {
        let offset = LineOffset::new(5, 3);
        for line in 4..=8 {
            assert_eq!(offset.correct(line), 3, "line {line}");
        }
    }

    #[test]
    fn test_identity_offset() {
        let offset = LineOffset::IDENTITY;
        assert!(offset.is_identity());
        for line in [0, 1, 2, 100] {
            assert_eq!(offset.correct(line), line);
        }
    }

    #[test]
    fn test_serializes_as_pair() {
        let json = serde_json::to_string(&LineOffset::new(491, 1)).unwrap();
        assert_eq!(json, "[491,1]");
        let restored: LineOffset = serde_json::from_str("[12,4]").unwrap();
        assert_eq!(restored, LineOffset::new(12, 4));
    }
}
