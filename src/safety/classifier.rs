//! Keyword-based SELECT-only classification.
//!
//! This is a lexical heuristic, not a parser: it anchors on a leading
//! `SELECT` and rejects any whole-word occurrence of a data-modifying keyword
//! anywhere in the text, string literals and identifiers included. False
//! rejections are accepted; false permits are not.

use regex::Regex;
use std::sync::LazyLock;

use super::{sanitize, ForbiddenKeyword, RejectionReason, Verdict};

static LEADING_SELECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*SELECT").expect("select pattern is valid"));

static FORBIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = ForbiddenKeyword::ALL
        .iter()
        .map(|keyword| keyword.as_str())
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("keyword pattern is valid")
});

/// Classifies an already-sanitized query.
///
/// Permitted iff the text starts with `SELECT` (case-insensitive, after
/// optional whitespace) and contains none of the forbidden keywords as a
/// whole word. Statement separators get no special treatment: in
/// `SELECT 1; DROP TABLE x` the second statement is only caught because
/// `DROP` appears lexically.
pub fn classify(sanitized: &str) -> Verdict {
    if !begins_with_select(sanitized) {
        return Verdict::Rejected(RejectionReason::NotSelect);
    }

    match first_forbidden_keyword(sanitized) {
        Some(keyword) => Verdict::Rejected(RejectionReason::Forbidden(keyword)),
        None => Verdict::Permitted,
    }
}

/// Sanitizes and classifies a raw query in one step.
pub fn classify_sql(raw: &str) -> Verdict {
    classify(&sanitize(raw))
}

fn begins_with_select(sql: &str) -> bool {
    LEADING_SELECT.is_match(sql)
}

fn first_forbidden_keyword(sql: &str) -> Option<ForbiddenKeyword> {
    FORBIDDEN
        .find(sql)
        .and_then(|m| ForbiddenKeyword::parse(m.as_str()))
}
