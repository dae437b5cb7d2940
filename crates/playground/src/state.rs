//! Playground state and the known compiler table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Example program loaded on first start and after a reset.
pub const DEFAULT_CODE: &str = include_str!("../assets/example.cpp");
pub const DEFAULT_COMPILER: &str = "g102";
pub const DEFAULT_COMPILER_FLAGS: &str = "-fpermissive -std=c++17";

/// Field keys in serialisation order. Shared by share links and storage.
pub const STATE_KEYS: [&str; 4] = ["code", "compiler", "compiler_flags", "show_compiler_log"];

/// A Compiler Explorer compiler the playground offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compiler {
    pub name: &'static str,
    pub id: &'static str,
}

/// Compilers known to build the CTP header. GCC 7.3 and older lack a usable
/// `std::string_view`.
pub const COMPILERS: &[Compiler] = &[
    Compiler { name: "GCC trunk", id: "gsnapshot" },
    Compiler { name: "GCC 10.2", id: "g102" },
    Compiler { name: "GCC 10.1", id: "g101" },
    Compiler { name: "GCC 9.3", id: "g93" },
    Compiler { name: "GCC 9.2", id: "g92" },
    Compiler { name: "GCC 9.1", id: "g91" },
    Compiler { name: "GCC 8.3", id: "g83" },
    Compiler { name: "GCC 8.2", id: "g82" },
    Compiler { name: "GCC 8.1", id: "g81" },
    Compiler { name: "GCC 7.5", id: "g75" },
    Compiler { name: "GCC 7.4", id: "g74" },
];

pub fn find_compiler(id: &str) -> Option<&'static Compiler> {
    COMPILERS.iter().find(|c| c.id == id)
}

/// Everything the user can change in the playground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaygroundState {
    pub code: String,
    /// Compiler Explorer id. Unknown ids are forwarded as-is.
    pub compiler: String,
    pub compiler_flags: String,
    pub show_compiler_log: bool,
}

impl Default for PlaygroundState {
    fn default() -> Self {
        Self {
            code: DEFAULT_CODE.to_string(),
            compiler: DEFAULT_COMPILER.to_string(),
            compiler_flags: DEFAULT_COMPILER_FLAGS.to_string(),
            show_compiler_log: true,
        }
    }
}

impl PlaygroundState {
    pub fn has_known_compiler(&self) -> bool {
        find_compiler(&self.compiler).is_some()
    }

    /// `(key, value)` pairs in [`STATE_KEYS`] order, booleans as `true`/`false`.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (STATE_KEYS[0], self.code.clone()),
            (STATE_KEYS[1], self.compiler.clone()),
            (STATE_KEYS[2], self.compiler_flags.clone()),
            (STATE_KEYS[3], self.show_compiler_log.to_string()),
        ]
    }

    /// Overwrite the fields present in `data`. Unknown keys are ignored and a
    /// boolean field is set only by the exact text `true`.
    pub fn apply(&mut self, data: &HashMap<String, String>) {
        for (key, value) in data {
            match key.as_str() {
                "code" => self.code = value.clone(),
                "compiler" => self.compiler = value.clone(),
                "compiler_flags" => self.compiler_flags = value.clone(),
                "show_compiler_log" => self.show_compiler_log = value == "true",
                other => tracing::debug!(key = other, "ignoring unknown state key"),
            }
        }
    }
}
