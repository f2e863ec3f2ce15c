//! Infrastructure layer for replydict.
//!
//! Contains implementations of the ports defined in `replydict-core`:
//! the MongoDB `DocumentStore`, the PostgreSQL `KeywordRepository`, and the
//! configuration loader.

pub mod config;
pub mod mongo;
pub mod postgres;
