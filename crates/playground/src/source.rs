//! Inlining of the CTP header into user code.
//!
//! The compile service knows nothing about the CTP library, so the first
//! `#include <ctp/ctp.hpp>` is replaced by the header text itself and any
//! further includes of it are blanked. The returned [`LineOffset`] lets the
//! diagnostic parser map compiler line numbers back to the user's text.

use std::sync::LazyLock;

use ctp_diagnostics::LineOffset;
use regex::{NoExpand, Regex};

/// The compile-time printer header shipped with the playground.
pub const CTP_HEADER: &str = include_str!("../assets/ctp.hpp");

static CTP_INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#\s*include\s*<ctp/ctp\.hpp>").expect("CTP_INCLUDE_RE regex should compile")
});

/// Inline the bundled header. See [`inline_header`].
pub fn include_header(code: &str) -> (LineOffset, String) {
    inline_header(code, CTP_HEADER)
}

/// Replace the first CTP include in `code` with `header` and drop the rest.
///
/// Without an include the code is returned unchanged with the identity offset.
pub fn inline_header(code: &str, header: &str) -> (LineOffset, String) {
    let Some(include_line) = code
        .split('\n')
        .position(|line| CTP_INCLUDE_RE.is_match(line))
        .map(|i| i + 1)
    else {
        return (LineOffset::IDENTITY, code.to_string());
    };

    let header_lines = header.matches('\n').count();
    let inlined = CTP_INCLUDE_RE.replace(code, NoExpand(header));
    let inlined = CTP_INCLUDE_RE.replace_all(&inlined, "").into_owned();

    tracing::debug!(header_lines, include_line, "inlined CTP header");
    (LineOffset::new(header_lines, include_line), inlined)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "// ctp\n#define CTP 1\n";

    #[test]
    fn test_include_replaced_and_offset_reported() {
        let code = "int a;\n#include <ctp/ctp.hpp>\nint b;\n";
        let (offset, inlined) = inline_header(code, HEADER);
        assert_eq!(offset, LineOffset::new(2, 2));
        assert_eq!(inlined, "int a;\n// ctp\n#define CTP 1\n\nint b;\n");
        // `int b;` was line 3, now line 5.
        assert_eq!(inlined.split('\n').nth(4), Some("int b;"));
        assert_eq!(offset.correct(5), 3);
    }

    #[test]
    fn test_second_include_blanked() {
        let code = "#include <ctp/ctp.hpp>\n# include<ctp/ctp.hpp>\nx";
        let (offset, inlined) = inline_header(code, HEADER);
        assert_eq!(offset.include_line, 1);
        assert_eq!(inlined.matches("#define CTP 1").count(), 1);
        assert!(!inlined.contains("<ctp/ctp.hpp>"));
    }

    #[test]
    fn test_missing_include_is_identity() {
        let code = "int main() {}";
        let (offset, inlined) = inline_header(code, HEADER);
        assert!(offset.is_identity());
        assert_eq!(inlined, code);
    }

    #[test]
    fn test_header_with_dollar_signs_is_literal() {
        let (_, inlined) = inline_header("#include <ctp/ctp.hpp>", "a $1 ${x}\n");
        assert_eq!(inlined, "a $1 ${x}\n");
    }

    #[test]
    fn test_bundled_header_offset() {
        let (offset, inlined) = include_header(crate::state::DEFAULT_CODE);
        assert_eq!(offset.include_line, 1);
        assert_eq!(offset.header_lines, CTP_HEADER.matches('\n').count());
        assert!(inlined.contains("COMPILE_TIME_PRINTER_HPP_INCLUDE"));
    }
}
