//! Platform constants
//!
//! Centralized location for the fixed wire-format discriminants and the
//! persistence defaults shared across the workspace. The block-type and
//! code-language values are external interoperability constants and must not
//! be renumbered.

/// Block-type discriminant for a plain text block.
pub const BLOCK_TYPE_TEXT: i64 = 2;
/// Block-type discriminant for a level-1 heading. Levels 1..=6 occupy 3..=8.
pub const BLOCK_TYPE_HEADING1: i64 = 3;
/// Block-type discriminant for a bullet list item.
pub const BLOCK_TYPE_BULLET: i64 = 12;
/// Block-type discriminant for an ordered list item.
pub const BLOCK_TYPE_ORDERED: i64 = 13;
/// Block-type discriminant for a quote block.
pub const BLOCK_TYPE_QUOTE: i64 = 14;
/// Block-type discriminant for a code block.
pub const BLOCK_TYPE_CODE: i64 = 15;
/// Block-type discriminant for a divider.
pub const BLOCK_TYPE_DIVIDER: i64 = 22;
/// Block-type discriminant for a table shell.
pub const BLOCK_TYPE_TABLE: i64 = 31;
/// Block-type discriminant for a table cell (platform-created, read back
/// when populating cell content).
pub const BLOCK_TYPE_TABLE_CELL: i64 = 32;

// Document persistence defaults
pub const MAX_CHILDREN_PER_CALL: usize = 50;
pub const DEFAULT_CELL_CONCURRENCY: usize = 5;

// Table width allocation
pub const DEFAULT_TABLE_WIDTH_BUDGET: u32 = 720;
pub const MIN_COLUMN_WIDTH: u32 = 60;
pub const MAX_COLUMN_FRACTION: f64 = 0.6;

/// Code-language id the platform uses for untagged or unrecognized fences.
pub const PLAINTEXT_LANGUAGE_ID: i64 = 1;

/// Map a fenced-code info string to the platform's numeric language id.
///
/// Matching is case-insensitive and covers the common aliases; anything not
/// in the table falls back to [`PLAINTEXT_LANGUAGE_ID`].
#[must_use]
pub fn code_language_id(name: &str) -> i64 {
    match name.trim().to_ascii_lowercase().as_str() {
        "bash" => 7,
        "c#" | "cs" | "csharp" => 8,
        "c++" | "cpp" => 9,
        "c" => 10,
        "css" => 12,
        "dart" => 15,
        "diff" => 17,
        "dockerfile" | "docker" => 18,
        "erlang" => 20,
        "go" | "golang" => 22,
        "groovy" => 24,
        "html" => 25,
        "json" => 29,
        "java" => 30,
        "javascript" | "js" => 31,
        "kotlin" | "kt" => 33,
        "latex" | "tex" => 34,
        "lua" => 36,
        "matlab" => 40,
        "nginx" => 43,
        "objective-c" | "objectivec" | "objc" => 44,
        "php" => 46,
        "perl" => 48,
        "powershell" | "ps1" => 49,
        "python" | "py" => 52,
        "r" => 53,
        "ruby" | "rb" => 55,
        "rust" | "rs" => 56,
        "scss" => 58,
        "sql" => 59,
        "scala" => 60,
        "shell" | "sh" | "zsh" => 63,
        "swift" => 64,
        "typescript" | "ts" => 66,
        "vue" => 68,
        "xml" => 69,
        "yaml" | "yml" => 70,
        _ => PLAINTEXT_LANGUAGE_ID,
    }
}
