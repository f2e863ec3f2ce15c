//! Business logic and port definitions for replydict.
//!
//! This crate defines the ports (`DocumentStore`, `KeywordRepository`) that
//! the infrastructure layer implements, the sequence allocator and the
//! sequenced collection built on top of `DocumentStore`, and the text
//! formatting used to present keyword entries. It depends only on
//! `replydict-types` -- never on `replydict-infra` or any database driver.

pub mod document;
pub mod format;
pub mod repository;
pub mod service;
