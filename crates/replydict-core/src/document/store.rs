//! Document store trait.
//!
//! The storage boundary for sequenced collections. Implementations live in
//! replydict-infra (MongoDB) and in [`super::memory`] (in-process).

use bson::{Bson, Document};
use replydict_types::error::StoreError;

/// Acknowledgment of a single-document write.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedOne {
    pub inserted_id: Bson,
    pub acknowledged: bool,
}

/// Acknowledgment of a batch write, ids in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedMany {
    pub inserted_ids: Vec<Bson>,
    pub acknowledged: bool,
}

/// Trait for a database of named document collections.
///
/// Every operation addresses a collection by name. `find_one_and_update` must
/// apply its update atomically on the server side; the sequence allocator
/// relies on it for `$inc` with return-after semantics.
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait DocumentStore: Send + Sync {
    /// Names of the collections that currently exist.
    fn collection_names(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Insert one document. An `_id` is generated when absent.
    fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> impl std::future::Future<Output = Result<InsertedOne, StoreError>> + Send;

    /// Insert documents in order, stopping at the first failure.
    fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> impl std::future::Future<Output = Result<InsertedMany, StoreError>> + Send;

    /// Drop a collection with its documents and indexes. No-op if absent.
    fn drop_collection(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Create a (descending) index over `fields`, creating the collection if needed.
    fn create_index(
        &self,
        collection: &str,
        fields: &[String],
        unique: bool,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Atomically apply `update` to the first document matching `filter`.
    ///
    /// Returns the document as it is after the update when `return_after` is
    /// true, as it was before otherwise, or `None` when nothing matched.
    fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        return_after: bool,
    ) -> impl std::future::Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Delete every document matching `filter`. Returns the number deleted.
    fn delete_many(
        &self,
        collection: &str,
        filter: Document,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Documents matching `filter`, in insertion order, at most `limit` of them.
    fn find(
        &self,
        collection: &str,
        filter: Document,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Document>, StoreError>> + Send;
}
