//! Query gating and bounded execution.
//!
//! This module ties the safety gate to a database client and applies the
//! response row cap.

pub mod executor;

pub use executor::{QueryExecutor, MAX_ROWS, STATEMENT_TIMEOUT};
