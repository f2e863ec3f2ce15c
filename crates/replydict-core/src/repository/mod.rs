//! Repository trait definitions (ports).
//!
//! These traits define the relational storage interface that the
//! infrastructure layer (replydict-infra) implements. The core crate never
//! depends on any specific storage technology.

pub mod keyword;
