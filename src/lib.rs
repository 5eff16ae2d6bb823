//! SQL gateway - a read-only HTTP API for SELECT queries against PostgreSQL.
//!
//! This library exposes the core modules for use by the binary and
//! integration tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;
pub mod safety;
