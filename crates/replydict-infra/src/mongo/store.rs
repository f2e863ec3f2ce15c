//! MongoDB document store implementation.
//!
//! Implements `DocumentStore` from `replydict-core` on one MongoDB database.
//! `find_one_and_update` maps onto the server's `findAndModify`, which is the
//! atomic increment-and-fetch the sequence allocator depends on.

use bson::{Bson, Document};
use futures_util::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{Acknowledgment, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use replydict_core::document::store::{DocumentStore, InsertedMany, InsertedOne};
use replydict_types::error::StoreError;

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed implementation of `DocumentStore`.
#[derive(Clone)]
pub struct MongoDocumentStore {
    db: Database,
}

impl MongoDocumentStore {
    /// Connect to `uri` and use `database`.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await.map_err(map_mongo_error)?;
        tracing::debug!(database = %database, "connected to MongoDB");
        Ok(Self::new(client.database(database)))
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    /// Writes are acknowledged unless the database is configured with `w: 0`.
    fn acknowledged(&self) -> bool {
        !matches!(
            self.db.write_concern().and_then(|wc| wc.w.as_ref()),
            Some(Acknowledgment::Nodes(0))
        )
    }
}

/// Translate a driver error, singling out unique index violations.
fn map_mongo_error(err: mongodb::error::Error) -> StoreError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::InsertMany(insert_error) => insert_error
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY)),
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    };

    if duplicate {
        StoreError::Constraint(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

impl DocumentStore for MongoDocumentStore {
    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        self.db
            .list_collection_names()
            .await
            .map_err(map_mongo_error)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertedOne, StoreError> {
        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(map_mongo_error)?;

        Ok(InsertedOne {
            inserted_id: result.inserted_id,
            acknowledged: self.acknowledged(),
        })
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<InsertedMany, StoreError> {
        if documents.is_empty() {
            return Ok(InsertedMany {
                inserted_ids: Vec::new(),
                acknowledged: self.acknowledged(),
            });
        }

        let result = self
            .collection(collection)
            .insert_many(documents)
            .await
            .map_err(map_mongo_error)?;

        let mut indexed: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
        indexed.sort_by_key(|(index, _)| *index);

        Ok(InsertedMany {
            inserted_ids: indexed.into_iter().map(|(_, id)| id).collect(),
            acknowledged: self.acknowledged(),
        })
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.collection(collection)
            .drop()
            .await
            .map_err(map_mongo_error)
    }

    async fn create_index(&self, collection: &str, fields: &[String], unique: bool) -> Result<(), StoreError> {
        let mut keys = Document::new();
        for field in fields {
            keys.insert(field.clone(), -1);
        }
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();

        let created = self
            .collection(collection)
            .create_index(model)
            .await
            .map_err(map_mongo_error)?;
        tracing::debug!(collection = %collection, index = %created.index_name, unique, "created index");
        Ok(())
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        return_after: bool,
    ) -> Result<Option<Document>, StoreError> {
        let return_document = if return_after {
            ReturnDocument::After
        } else {
            ReturnDocument::Before
        };

        self.collection(collection)
            .find_one_and_update(filter, update)
            .return_document(return_document)
            .await
            .map_err(map_mongo_error)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        let result = self
            .collection(collection)
            .delete_many(filter)
            .await
            .map_err(map_mongo_error)?;
        Ok(result.deleted_count)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        let coll = self.collection(collection);
        let mut find = coll.find(filter);
        if let Some(limit) = limit {
            find = find.limit(limit);
        }

        let cursor = find.await.map_err(map_mongo_error)?;
        cursor.try_collect().await.map_err(map_mongo_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use bson::oid::ObjectId;
    use replydict_core::document::collection::SequencedCollection;
    use replydict_types::document::CollectionSpec;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Connect to a throwaway database, or `None` when no server is configured.
    async fn test_store() -> Option<MongoDocumentStore> {
        let uri = std::env::var("REPLYDICT_TEST_MONGO_URI").ok()?;
        let database = format!("replydict_test_{}", ObjectId::new().to_hex());
        Some(MongoDocumentStore::connect(&uri, &database).await.unwrap())
    }

    #[tokio::test]
    async fn test_find_one_and_update_increments_atomically() {
        let Some(store) = test_store().await else { return };

        store
            .insert_one("counter", doc! { "_id": "x", "_seq": 0_i64 })
            .await
            .unwrap();
        let after = store
            .find_one_and_update("counter", doc! { "_id": "x" }, doc! { "$inc": { "_seq": 1_i64 } }, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.get_i64("_seq").unwrap(), 1);

        store.database().drop().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_key_maps_to_constraint() {
        let Some(store) = test_store().await else { return };

        store.insert_one("c", doc! { "_id": 1 }).await.unwrap();
        let err = store.insert_one("c", doc! { "_id": 1 }).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        let err = store
            .insert_many("c", vec![doc! { "_id": 2 }, doc! { "_id": 2 }])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));

        store.database().drop().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_many_returns_ids_in_order() {
        let Some(store) = test_store().await else { return };

        let ack = store
            .insert_many("c", vec![doc! { "_id": "a" }, doc! { "_id": "b" }, doc! { "_id": "c" }])
            .await
            .unwrap();
        assert_eq!(
            ack.inserted_ids,
            vec![Bson::from("a"), Bson::from("b"), Bson::from("c")]
        );
        assert!(ack.acknowledged);

        store.database().drop().await.unwrap();
    }

    #[tokio::test]
    async fn test_find_applies_filter_and_limit() {
        let Some(store) = test_store().await else { return };

        store
            .insert_many(
                "c",
                vec![doc! { "g": 1, "i": 0 }, doc! { "g": 1, "i": 1 }, doc! { "g": 2, "i": 2 }],
            )
            .await
            .unwrap();

        assert_eq!(store.find("c", doc! { "g": 1 }, None).await.unwrap().len(), 2);
        assert_eq!(store.find("c", doc! {}, Some(1)).await.unwrap().len(), 1);
        assert!(store.find("missing", doc! {}, None).await.unwrap().is_empty());

        store.database().drop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sequenced_collection_against_server() {
        let Some(store) = test_store().await else { return };
        let store = Arc::new(store);

        let coll = Arc::new(
            SequencedCollection::open(Arc::clone(&store), &CollectionSpec::sequenced("messages"))
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..200 {
            let coll = Arc::clone(&coll);
            handles.push(tokio::spawn(async move {
                coll.insert_one(doc! { "i": i }).await.unwrap().inserted_seq_id
            }));
        }
        let mut seqs = HashSet::new();
        for handle in handles {
            assert!(seqs.insert(handle.await.unwrap()));
        }
        assert_eq!(seqs, (1..=200).collect::<HashSet<i64>>());

        coll.drop_collection().await.unwrap();
        let recreated = SequencedCollection::open(Arc::clone(&store), &CollectionSpec::sequenced("messages"))
            .await
            .unwrap();
        assert_eq!(recreated.insert_one(doc! {}).await.unwrap().inserted_seq_id, 1);

        store.database().drop().await.unwrap();
    }
}
