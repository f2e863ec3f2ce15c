//! MongoDB storage layer.
//!
//! Document store backing sequenced collections and their counter records.

pub mod store;
