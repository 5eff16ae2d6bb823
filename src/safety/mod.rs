//! Query safety gate.
//!
//! Strips comments from a raw query and decides whether it may be forwarded
//! to the database. Only lexical SELECT-only checks are performed.

mod classifier;
mod sanitizer;

pub use classifier::{classify, classify_sql};
pub use sanitizer::sanitize;

use crate::error::{GatewayError, Result};
use std::fmt;

/// Message returned to callers whose query fails the gate.
pub const REJECTION_MESSAGE: &str =
    "Only SELECT queries are allowed. Data-modifying statements are forbidden.";

/// Keywords whose whole-word presence rejects a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForbiddenKeyword {
    Insert,
    Update,
    Delete,
    Drop,
    Create,
    Alter,
    Truncate,
    Grant,
    Revoke,
}

impl ForbiddenKeyword {
    /// All forbidden keywords, in match-priority order.
    pub const ALL: [ForbiddenKeyword; 9] = [
        Self::Insert,
        Self::Update,
        Self::Delete,
        Self::Drop,
        Self::Create,
        Self::Alter,
        Self::Truncate,
        Self::Grant,
        Self::Revoke,
    ];

    /// Returns the keyword in upper case.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Drop => "DROP",
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Truncate => "TRUNCATE",
            Self::Grant => "GRANT",
            Self::Revoke => "REVOKE",
        }
    }

    /// Parses a keyword case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|keyword| keyword.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ForbiddenKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a query was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// The sanitized text does not start with `SELECT`.
    NotSelect,
    /// A data-modifying keyword appears somewhere in the text.
    Forbidden(ForbiddenKeyword),
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelect => write!(f, "query does not begin with SELECT"),
            Self::Forbidden(keyword) => write!(f, "query contains forbidden keyword {keyword}"),
        }
    }
}

/// Outcome of classifying a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Permitted,
    Rejected(RejectionReason),
}

impl Verdict {
    /// Returns true if the query may be executed.
    pub fn is_permitted(&self) -> bool {
        matches!(self, Self::Permitted)
    }

    /// Converts a rejection into a validation error.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Permitted => Ok(()),
            Self::Rejected(_) => Err(GatewayError::validation(REJECTION_MESSAGE)),
        }
    }
}
