//! Sequenced collection wrapper.
//!
//! Wraps one named collection of a [`DocumentStore`]. When the collection is
//! sequenced, every inserted document is stamped with a fresh `_seq` from the
//! [`SequenceAllocator`] before it is written. The allocation and the write
//! are separate operations: a failed write leaves a gap, never a duplicate.

use std::sync::Arc;

use bson::Document;
use replydict_types::document::{
    CollectionSpec, InsertManyResult, InsertOneResult, NOT_EXIST_SEQ_ID, SEQUENCE_FIELD,
};
use replydict_types::error::StoreError;

use super::sequence::SequenceAllocator;
use super::store::DocumentStore;

/// A named collection that optionally receives auto-incrementing `_seq` values.
pub struct SequencedCollection<S> {
    store: Arc<S>,
    allocator: SequenceAllocator<S>,
    name: String,
    sequenced: bool,
    index_columns: Vec<String>,
}

impl<S: DocumentStore> SequencedCollection<S> {
    /// Open the collection described by `spec`, declaring it if it does not exist.
    ///
    /// Declaring a sequenced collection creates its counter record at 0 and a
    /// unique index on `_seq`. Declared index columns get a unique compound
    /// index. An existing collection is opened as is, keeping its counter; a
    /// counter whose collection is gone is replaced by a fresh one.
    ///
    /// Malformed `index_columns` fail with [`StoreError::Config`] before any
    /// store access.
    pub async fn open(store: Arc<S>, spec: &CollectionSpec) -> Result<Self, StoreError> {
        let collection = Self::from_spec(store, spec)?;
        if !collection.exists().await? {
            collection.declare().await?;
        }
        Ok(collection)
    }

    /// Open the collection only if it already exists. Never writes.
    pub async fn open_existing(store: Arc<S>, spec: &CollectionSpec) -> Result<Option<Self>, StoreError> {
        let collection = Self::from_spec(store, spec)?;
        if collection.exists().await? {
            Ok(Some(collection))
        } else {
            Ok(None)
        }
    }

    fn from_spec(store: Arc<S>, spec: &CollectionSpec) -> Result<Self, StoreError> {
        let index_columns = spec.resolved_index_columns()?;
        if spec.name.is_empty() {
            return Err(StoreError::Config("collection name must not be empty".to_string()));
        }

        Ok(Self {
            allocator: SequenceAllocator::new(Arc::clone(&store)),
            store,
            name: spec.name.clone(),
            sequenced: spec.sequenced,
            index_columns,
        })
    }

    async fn exists(&self) -> Result<bool, StoreError> {
        let names = self.store.collection_names().await?;
        Ok(names.iter().any(|n| n == &self.name))
    }

    async fn declare(&self) -> Result<(), StoreError> {
        if self.sequenced {
            // A counter left behind by an interrupted declaration or an
            // outside drop belongs to a collection that no longer exists.
            let stale = self.allocator.drop_counter(&self.name).await?;
            if stale > 0 {
                tracing::warn!(collection = %self.name, "discarded counter of a missing collection");
            }
            self.allocator.init_counter(&self.name).await?;
            self.store
                .create_index(&self.name, &[SEQUENCE_FIELD.to_string()], true)
                .await?;
        }
        if !self.index_columns.is_empty() {
            self.store
                .create_index(&self.name, &self.index_columns, true)
                .await?;
        }
        tracing::info!(
            collection = %self.name,
            sequenced = self.sequenced,
            index_columns = ?self.index_columns,
            "declared collection"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_sequenced(&self) -> bool {
        self.sequenced
    }

    pub fn index_columns(&self) -> &[String] {
        &self.index_columns
    }

    pub fn allocator(&self) -> &SequenceAllocator<S> {
        &self.allocator
    }

    /// Insert one document, stamping it with a new `_seq` when sequenced.
    ///
    /// A document that already carries `_seq` is rejected with
    /// [`StoreError::Validation`] before anything is allocated or written.
    pub async fn insert_one(&self, mut document: Document) -> Result<InsertOneResult, StoreError> {
        let mut inserted_seq_id = NOT_EXIST_SEQ_ID;

        if self.sequenced {
            reject_preassigned(&document)?;
            inserted_seq_id = self.allocator.next_sequence(&self.name).await?;
            document.insert(SEQUENCE_FIELD, inserted_seq_id);
        }

        let ack = self.store.insert_one(&self.name, document).await?;
        Ok(InsertOneResult {
            inserted_id: ack.inserted_id,
            acknowledged: ack.acknowledged,
            inserted_seq_id,
        })
    }

    /// Insert documents in order, allocating one `_seq` per document.
    ///
    /// Every document is validated before the first allocation. Allocation is
    /// one allocator call per document, in input order, all before the batch
    /// write. If the write fails the allocated values become gaps.
    pub async fn insert_many(
        &self,
        mut documents: Vec<Document>,
    ) -> Result<InsertManyResult, StoreError> {
        let inserted_seq_ids = if self.sequenced {
            for document in &documents {
                reject_preassigned(document)?;
            }
            let mut seqs = Vec::with_capacity(documents.len());
            for document in &mut documents {
                let seq = self.allocator.next_sequence(&self.name).await?;
                document.insert(SEQUENCE_FIELD, seq);
                seqs.push(seq);
            }
            seqs
        } else {
            vec![NOT_EXIST_SEQ_ID; documents.len()]
        };

        let ack = self.store.insert_many(&self.name, documents).await?;
        Ok(InsertManyResult {
            inserted_ids: ack.inserted_ids,
            acknowledged: ack.acknowledged,
            inserted_seq_ids,
        })
    }

    /// Drop the collection and its counter record.
    ///
    /// Re-opening the same name afterwards declares it afresh, starting at 0.
    pub async fn drop_collection(&self) -> Result<(), StoreError> {
        let counters = self.allocator.drop_counter(&self.name).await?;
        self.store.drop_collection(&self.name).await?;
        tracing::info!(collection = %self.name, counters, "dropped collection");
        Ok(())
    }

    /// Documents matching `filter`, bounded by `limit` or else `limit_default`.
    ///
    /// Neither set means unbounded. A non-positive limit is a
    /// [`StoreError::Validation`].
    pub async fn find(
        &self,
        filter: Document,
        limit: Option<i64>,
        limit_default: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        let limit = resolve_limit(limit, limit_default)?;
        self.store.find(&self.name, filter, limit).await
    }
}

fn reject_preassigned(document: &Document) -> Result<(), StoreError> {
    if document.contains_key(SEQUENCE_FIELD) {
        return Err(StoreError::Validation(format!(
            "remove the {SEQUENCE_FIELD} field; sequence values are assigned on insert"
        )));
    }
    Ok(())
}

fn resolve_limit(limit: Option<i64>, limit_default: Option<i64>) -> Result<Option<i64>, StoreError> {
    for value in [limit, limit_default].into_iter().flatten() {
        if value <= 0 {
            return Err(StoreError::Validation(format!(
                "limit must be positive, got {value}"
            )));
        }
    }
    Ok(limit.or(limit_default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::memory::InMemoryDocumentStore;
    use bson::doc;
    use replydict_types::document::COUNTER_COLLECTION;
    use std::collections::HashSet;

    async fn open(
        store: &Arc<InMemoryDocumentStore>,
        spec: CollectionSpec,
    ) -> SequencedCollection<InMemoryDocumentStore> {
        SequencedCollection::open(Arc::clone(store), &spec).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_declares_counter_and_index() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;

        assert!(coll.is_sequenced());
        assert_eq!(coll.allocator().current("messages").await.unwrap(), Some(0));
        let names = store.collection_names().await.unwrap();
        assert!(names.contains(&"messages".to_string()));
        assert!(names.contains(&COUNTER_COLLECTION.to_string()));
    }

    #[tokio::test]
    async fn test_sequence_index_rejects_duplicate_written_directly() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        coll.insert_one(doc! { "text": "a" }).await.unwrap();

        let err = store
            .insert_one("messages", doc! { "text": "b", "_seq": 1_i64 })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.count("messages"), 1);
    }

    #[tokio::test]
    async fn test_open_replaces_counter_of_missing_collection() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let allocator = SequenceAllocator::new(Arc::clone(&store));
        allocator.init_counter("messages").await.unwrap();
        allocator.next_sequence("messages").await.unwrap();
        allocator.next_sequence("messages").await.unwrap();

        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        assert_eq!(coll.allocator().current("messages").await.unwrap(), Some(0));
        assert_eq!(coll.insert_one(doc! {}).await.unwrap().inserted_seq_id, 1);

        let counters = store
            .find(COUNTER_COLLECTION, doc! { "_id": "messages" }, None)
            .await
            .unwrap();
        assert_eq!(counters.len(), 1);
    }

    #[tokio::test]
    async fn test_open_existing_does_not_declare() {
        let store = Arc::new(InMemoryDocumentStore::new());

        let missing = SequencedCollection::open_existing(Arc::clone(&store), &CollectionSpec::sequenced("typo"))
            .await
            .unwrap();
        assert!(missing.is_none());
        assert!(store.collection_names().await.unwrap().is_empty());

        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        coll.insert_one(doc! { "text": "a" }).await.unwrap();

        let found = SequencedCollection::open_existing(Arc::clone(&store), &CollectionSpec::sequenced("messages"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.find(doc! {}, None, None).await.unwrap().len(), 1);
        assert_eq!(found.allocator().current("messages").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_reopen_keeps_counter() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        coll.insert_one(doc! { "text": "a" }).await.unwrap();

        let again = open(&store, CollectionSpec::sequenced("messages")).await;
        let result = again.insert_one(doc! { "text": "b" }).await.unwrap();
        assert_eq!(result.inserted_seq_id, 2);
    }

    #[tokio::test]
    async fn test_insert_one_assigns_increasing_sequence() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;

        for expected in 1..=5 {
            let result = coll.insert_one(doc! { "n": expected }).await.unwrap();
            assert_eq!(result.inserted_seq_id, expected);
            assert!(result.acknowledged);
        }

        let stored = coll.find(doc! { "_seq": 3_i64 }, None, None).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get_i64("n").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unsequenced_insert_reports_sentinel() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::unsequenced("raw")).await;

        let result = coll.insert_one(doc! { "text": "a" }).await.unwrap();
        assert_eq!(result.inserted_seq_id, NOT_EXIST_SEQ_ID);

        let stored = coll.find(doc! {}, None, None).await.unwrap();
        assert!(!stored[0].contains_key(SEQUENCE_FIELD));
        assert_eq!(coll.allocator().current("raw").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unsequenced_insert_many_reports_sentinels() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::unsequenced("raw")).await;

        let result = coll
            .insert_many(vec![doc! { "a": 1 }, doc! { "a": 2 }])
            .await
            .unwrap();
        assert_eq!(result.inserted_seq_ids, vec![NOT_EXIST_SEQ_ID, NOT_EXIST_SEQ_ID]);
        assert_eq!(result.inserted_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_preassigned_sequence_is_rejected_without_side_effects() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;

        let err = coll
            .insert_one(doc! { "_seq": 42_i64, "text": "a" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(coll.allocator().current("messages").await.unwrap(), Some(0));
        assert_eq!(store.count("messages"), 0);
    }

    #[tokio::test]
    async fn test_preassigned_sequence_in_batch_rejects_whole_batch() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;

        let err = coll
            .insert_many(vec![doc! { "a": 1 }, doc! { "_seq": 9_i64 }])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(coll.allocator().current("messages").await.unwrap(), Some(0));
        assert_eq!(store.count("messages"), 0);
    }

    #[tokio::test]
    async fn test_insert_many_preserves_input_order() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        coll.insert_one(doc! { "name": "first" }).await.unwrap();

        let result = coll
            .insert_many(vec![
                doc! { "name": "a" },
                doc! { "name": "b" },
                doc! { "name": "c" },
            ])
            .await
            .unwrap();
        assert_eq!(result.inserted_seq_ids, vec![2, 3, 4]);

        for (name, seq) in ["a", "b", "c"].iter().zip(&result.inserted_seq_ids) {
            let found = coll.find(doc! { "name": *name }, None, None).await.unwrap();
            assert_eq!(found[0].get_i64(SEQUENCE_FIELD).unwrap(), *seq);
        }
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_gap_not_duplicate() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let spec = CollectionSpec::sequenced("users").with_index_columns(["user_id"]);
        let coll = open(&store, spec).await;
        coll.insert_one(doc! { "user_id": "u1" }).await.unwrap();

        let err = coll
            .insert_many(vec![doc! { "user_id": "u2" }, doc! { "user_id": "u1" }])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        // Both values were allocated; the next insert continues past them.
        let next = coll.insert_one(doc! { "user_id": "u3" }).await.unwrap();
        assert_eq!(next.inserted_seq_id, 4);
    }

    #[tokio::test]
    async fn test_index_columns_enforce_uniqueness() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let spec = CollectionSpec::unsequenced("users").with_index_columns(["group", "user"]);
        let coll = open(&store, spec).await;

        coll.insert_one(doc! { "group": "g", "user": "a" }).await.unwrap();
        coll.insert_one(doc! { "group": "g", "user": "b" }).await.unwrap();
        let err = coll
            .insert_one(doc! { "group": "g", "user": "a" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_malformed_index_columns_fail_at_open() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let spec = CollectionSpec {
            name: "users".to_string(),
            sequenced: true,
            index_columns: Some(serde_json::json!({ "user": 1 })),
        };
        let err = SequencedCollection::open(Arc::clone(&store), &spec)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::Config(_)));
        assert!(store.collection_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_resets_counter() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        for _ in 0..3 {
            coll.insert_one(doc! {}).await.unwrap();
        }

        coll.drop_collection().await.unwrap();
        assert_eq!(coll.allocator().current("messages").await.unwrap(), None);

        let recreated = open(&store, CollectionSpec::sequenced("messages")).await;
        let result = recreated.insert_one(doc! {}).await.unwrap();
        assert_eq!(result.inserted_seq_id, 1);
    }

    #[tokio::test]
    async fn test_insert_after_external_counter_loss_is_not_found() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        coll.allocator().drop_counter("messages").await.unwrap();

        let err = coll.insert_one(doc! {}).await.unwrap_err();
        assert!(matches!(err, StoreError::CounterNotFound(_)));
        assert_eq!(store.count("messages"), 0);
    }

    #[tokio::test]
    async fn test_find_limit_resolution() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = open(&store, CollectionSpec::sequenced("messages")).await;
        for _ in 0..6 {
            coll.insert_one(doc! {}).await.unwrap();
        }

        assert_eq!(coll.find(doc! {}, None, None).await.unwrap().len(), 6);
        assert_eq!(coll.find(doc! {}, None, Some(4)).await.unwrap().len(), 4);
        assert_eq!(coll.find(doc! {}, Some(2), Some(4)).await.unwrap().len(), 2);
        assert!(matches!(
            coll.find(doc! {}, Some(0), None).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_never_share_sequence() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let coll = Arc::new(open(&store, CollectionSpec::sequenced("messages")).await);

        let mut handles = Vec::new();
        for i in 0..250 {
            let coll = Arc::clone(&coll);
            handles.push(tokio::spawn(async move {
                coll.insert_one(doc! { "i": i }).await.unwrap().inserted_seq_id
            }));
        }

        let mut seqs = HashSet::new();
        for handle in handles {
            assert!(seqs.insert(handle.await.unwrap()), "duplicate inserted_seq_id");
        }
        assert_eq!(seqs.len(), 250);
        assert_eq!(store.count("messages"), 250);
        assert_eq!(coll.allocator().current("messages").await.unwrap(), Some(250));
    }
}
