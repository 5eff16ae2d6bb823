//! Built-in example queries served by `GET /example-queries`.

use serde::Serialize;

/// A titled sample query.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ExampleQuery {
    pub title: &'static str,
    pub query: &'static str,
}

pub const EXAMPLE_QUERIES: &[ExampleQuery] = &[
    ExampleQuery {
        title: "Simple SELECT query",
        query: "SELECT name FROM instructor",
    },
    ExampleQuery {
        title: "Query with a WHERE condition",
        query: "SELECT name FROM instructor WHERE dept_name = 'Physics'",
    },
    ExampleQuery {
        title: "Multi-table JOIN query",
        query: "SELECT DISTINCT T.name FROM instructor AS T, instructor AS S WHERE T.salary > S.salary AND S.dept_name = 'History'",
    },
];
