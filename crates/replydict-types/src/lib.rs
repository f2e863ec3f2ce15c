//! Shared domain types for replydict.
//!
//! This crate contains the types used across the workspace: sequenced
//! collection declarations and insert results, keyword dictionary entries,
//! global configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, bson, thiserror.

pub mod config;
pub mod document;
pub mod error;
pub mod keyword;
