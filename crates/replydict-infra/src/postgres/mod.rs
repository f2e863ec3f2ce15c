//! PostgreSQL storage layer.
//!
//! Keyword dictionary repository backed by a pooled PostgreSQL connection.

pub mod keyword;
pub mod pool;
