//! Per-collection sequence allocation.
//!
//! Each sequenced collection owns one counter record in
//! [`COUNTER_COLLECTION`], keyed by the collection's name. Allocation is a
//! single `find_one_and_update` with `$inc` and return-after, so concurrent
//! callers always receive distinct values without any lock in this process.
//! A value allocated for a write that later fails is simply never used.

use std::sync::Arc;

use bson::{doc, Bson, Document};
use replydict_types::document::{COUNTER_COLLECTION, COUNTER_KEY_FIELD, SEQUENCE_FIELD};
use replydict_types::error::StoreError;

use super::store::DocumentStore;

/// Allocates sequence values from the shared counter collection.
pub struct SequenceAllocator<S> {
    store: Arc<S>,
}

impl<S> Clone for SequenceAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> SequenceAllocator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create the counter record for `collection` at 0.
    ///
    /// Fails with [`StoreError::Constraint`] if a counter already exists.
    pub async fn init_counter(&self, collection: &str) -> Result<(), StoreError> {
        self.store
            .insert_one(
                COUNTER_COLLECTION,
                doc! { COUNTER_KEY_FIELD: collection, SEQUENCE_FIELD: 0_i64 },
            )
            .await?;
        tracing::debug!(collection = %collection, "initialized sequence counter");
        Ok(())
    }

    /// Atomically increment the counter of `collection` and return the new value.
    pub async fn next_sequence(&self, collection: &str) -> Result<i64, StoreError> {
        let counter = self
            .store
            .find_one_and_update(
                COUNTER_COLLECTION,
                counter_filter(collection),
                doc! { "$inc": { SEQUENCE_FIELD: 1_i64 } },
                true,
            )
            .await?
            .ok_or_else(|| StoreError::CounterNotFound(collection.to_string()))?;

        let seq = read_sequence(&counter)?;
        tracing::debug!(collection = %collection, seq, "allocated sequence value");
        Ok(seq)
    }

    /// Current counter value without incrementing, `None` if no counter exists.
    pub async fn current(&self, collection: &str) -> Result<Option<i64>, StoreError> {
        let found = self
            .store
            .find(COUNTER_COLLECTION, counter_filter(collection), Some(1))
            .await?;
        found.first().map(read_sequence).transpose()
    }

    /// Delete the counter record of `collection`. Returns the number removed.
    pub async fn drop_counter(&self, collection: &str) -> Result<u64, StoreError> {
        self.store
            .delete_many(COUNTER_COLLECTION, counter_filter(collection))
            .await
    }
}

fn counter_filter(collection: &str) -> Document {
    doc! { COUNTER_KEY_FIELD: collection }
}

fn read_sequence(counter: &Document) -> Result<i64, StoreError> {
    match counter.get(SEQUENCE_FIELD) {
        Some(Bson::Int64(v)) => Ok(*v),
        Some(Bson::Int32(v)) => Ok(i64::from(*v)),
        Some(other) => Err(StoreError::Backend(format!(
            "counter {SEQUENCE_FIELD} is not an integer: {other}"
        ))),
        None => Err(StoreError::Backend(format!(
            "counter record has no {SEQUENCE_FIELD} field"
        ))),
    }
}
