//! Document storage: the `DocumentStore` port, the sequence allocator, and
//! the sequenced collection wrapper.

pub mod collection;
pub mod memory;
pub mod sequence;
pub mod store;
