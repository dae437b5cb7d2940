//! Integration tests: realistic gcc logs through parser and marker mapper.

use ctp_diagnostics::{markers, parse, parse_log, Document, LineOffset, PrinterRecord, Severity};

/// User text as shown in the editor: include on line 2, error on line 5.
const USER_CODE: &str = "// demo\n#include <ctp/ctp.hpp>\n\nconstexpr int f() {\n    return y;\n}\n";

/// gcc log for the same text compiled with a 10-line header inlined at line 2.
fn header_log() -> Vec<String> {
    [
        "<source>: In function 'constexpr int f()':",
        "<source>:15:12: error: 'y' was not declared in this scope",
        "   15 |     return y;",
        "      |            ^",
        "<source>:7:5: note: in definition of macro 'CTP_INTERNAL_PRINT'",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[test]
fn test_header_offset_end_to_end() {
    let offset = LineOffset::new(10, 2);
    let entries: Vec<_> = parse_log(offset, header_log(), true).collect();

    assert_eq!(entries.len(), 5);
    assert_eq!(
        entries[1].message,
        "<source>:5:12: error: 'y' was not declared in this scope"
    );
    assert_eq!(entries[2].message, "    5 |     return y;");
    assert_eq!(entries[3].message, "      |            ^");
    // Inside the header: pinned to the include directive.
    assert_eq!(
        entries[4].message,
        "<source>:2:5: note: in definition of macro 'CTP_INTERNAL_PRINT'"
    );

    let found = markers(&entries, &Document::new(USER_CODE));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, 5);
    assert_eq!(found[0].start_col, 5);
    assert_eq!(found[0].end_col, 14);
    assert_eq!(found[0].severity, Severity::Error);
}

#[test]
fn test_quiet_log_keeps_only_error_header() {
    let entries: Vec<_> = parse_log(LineOffset::new(10, 2), header_log(), false).collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].message.starts_with("<source>:5:12: error:"));
}

#[test]
fn test_undeclared_identifier_scenario() {
    let code = "int main(){ return x; }";
    let log = vec![
        "<source>: In function 'int main()':".to_string(),
        "<source>:1:20: error: 'x' was not declared in this scope".to_string(),
        "    1 | int main(){ return x; }".to_string(),
        "      |                    ^".to_string(),
    ];
    let entries: Vec<_> = parse_log(LineOffset::IDENTITY, log, false).collect();

    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_error_output);
    assert!(entries[0].is_compiler_output);

    let found = markers(&entries, &Document::new(code));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].line, 1);
    assert_eq!(found[0].severity, Severity::Error);
}

#[test]
fn test_marker_dropped_after_user_deletes_lines() {
    let entries: Vec<_> = parse_log(LineOffset::IDENTITY, header_log(), false).collect();
    let shrunk = Document::new("int main() {}\n");
    assert!(markers(&entries, &shrunk).is_empty());
}

#[test]
fn test_program_output_mixed_with_compiler_log() {
    let records = vec![
        PrinterRecord::program("Integral:\n", false),
        PrinterRecord::program("true 1 -2\n", false),
        PrinterRecord::compiler("<source>:20:3: warning: unused variable 'i'"),
        PrinterRecord::program("\tFatal success! :)\n", true),
    ];
    let entries: Vec<_> = parse(LineOffset::new(10, 2), records, false).collect();

    assert_eq!(entries.len(), 4);
    assert!(!entries[0].is_compiler_output);
    assert!(!entries[0].is_error_output);
    assert_eq!(
        entries[2].message,
        "<source>:10:3: warning: unused variable 'i'"
    );
    assert!(entries[3].is_error_output);
    assert!(!entries[3].is_compiler_output);
}
