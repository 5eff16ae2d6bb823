//! Comment stripping for raw SQL text.
//!
//! Removes `--` line comments and `/* ... */` block comments so that keyword
//! checks cannot be dodged by hiding tokens inside a comment (or by hiding a
//! harmless `SELECT` in front of a commented-out prefix).

use regex::Regex;
use std::sync::LazyLock;

/// `--` through the end of the line (the newline is consumed) or end of input.
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--.*?(?:\n|$)").expect("line comment pattern is valid"));

/// `/*` through the nearest `*/`, spanning newlines. An unterminated `/*`
/// matches nothing and is left in place.
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

/// Strips SQL comments from `raw` and trims surrounding whitespace.
///
/// Line comments are removed before block comments, so a `--` inside a block
/// comment swallows the rest of its line (including a closing `*/` on it).
/// Comment markers inside string literals are stripped as well; the
/// sanitizer has no notion of quoting.
///
/// Never fails: every input maps to some string.
pub fn sanitize(raw: &str) -> String {
    let without_lines = LINE_COMMENT.replace_all(raw, " ");
    let without_blocks = BLOCK_COMMENT.replace_all(&without_lines, " ");
    without_blocks.trim().to_string()
}
