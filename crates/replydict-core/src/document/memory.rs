//! In-process `DocumentStore`.
//!
//! Collections are held in a `DashMap`. Every operation on a collection runs
//! while holding that collection's map entry, which makes `$inc` through
//! `find_one_and_update` atomic with respect to concurrent callers and lets
//! unique indexes be checked and written in one step. Entry guards are never
//! held across an `.await`: all work happens in synchronous helpers.
//!
//! Supported query language: equality filters on top-level fields, and
//! `$inc` / `$set` updates.

use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{Bson, Document};
use dashmap::DashMap;
use replydict_types::error::StoreError;

use super::store::{DocumentStore, InsertedMany, InsertedOne};

const ID_FIELD: &str = "_id";

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: Vec<Document>,
    unique_indexes: Vec<Vec<String>>,
}

impl MemoryCollection {
    /// Reject `doc` if it collides with a stored document on `_id` or any
    /// unique index. `skip` excludes one stored position (the document being
    /// updated).
    fn check_unique(&self, doc: &Document, skip: Option<usize>) -> Result<(), StoreError> {
        let id_index = [ID_FIELD.to_string()];
        let indexes = std::iter::once(&id_index[..]).chain(self.unique_indexes.iter().map(Vec::as_slice));

        for fields in indexes {
            let key = index_key(doc, fields);
            let collides = self
                .documents
                .iter()
                .enumerate()
                .filter(|(pos, _)| Some(*pos) != skip)
                .any(|(_, stored)| index_key(stored, fields) == key);
            if collides {
                return Err(StoreError::Constraint(format!(
                    "duplicate key on ({}): {:?}",
                    fields.join(", "),
                    key
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, mut doc: Document) -> Result<Bson, StoreError> {
        if !doc.contains_key(ID_FIELD) {
            doc.insert(ID_FIELD, ObjectId::new());
        }
        self.check_unique(&doc, None)?;
        let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
        self.documents.push(doc);
        Ok(id)
    }
}

/// Missing fields index as `null`, matching MongoDB.
fn index_key(doc: &Document, fields: &[String]) -> Vec<Bson> {
    fields
        .iter()
        .map(|f| doc.get(f).cloned().unwrap_or(Bson::Null))
        .collect()
}

fn matches(doc: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (field, expected) in filter {
        if let Bson::Document(inner) = expected {
            if inner.keys().any(|k| k.starts_with('$')) {
                return Err(StoreError::Backend(format!(
                    "unsupported filter operator on '{field}'"
                )));
            }
        }
        match doc.get(field) {
            Some(stored) if values_equal(stored, expected) => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

/// Equality with numbers compared by value across Int32, Int64 and Double.
fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => as_i64(a) == as_i64(b),
        (Bson::Double(x), Bson::Int32(_) | Bson::Int64(_)) => as_i64(b).is_some_and(|y| *x == y as f64),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Double(y)) => as_i64(a).is_some_and(|x| x as f64 == *y),
        _ => a == b,
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        _ => None,
    }
}

fn add_numbers(current: Option<&Bson>, delta: &Bson) -> Result<Bson, StoreError> {
    let current = current.unwrap_or(&Bson::Int32(0));
    let sum = match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(v) => Bson::Int32(v),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Bson::Int64(_) | Bson::Int32(_), Bson::Int64(_) | Bson::Int32(_)) => {
            let (a, b) = (as_i64(current).unwrap_or(0), as_i64(delta).unwrap_or(0));
            let v = a.checked_add(b).ok_or_else(|| {
                StoreError::Backend(format!("$inc overflows a 64-bit integer: {a} + {b}"))
            })?;
            Bson::Int64(v)
        }
        (Bson::Double(a), Bson::Double(b)) => Bson::Double(a + b),
        (Bson::Double(a), Bson::Int32(b)) => Bson::Double(a + f64::from(*b)),
        (Bson::Int32(a), Bson::Double(b)) => Bson::Double(f64::from(*a) + b),
        (current, delta) => {
            return Err(StoreError::Backend(format!(
                "cannot apply $inc {delta} to {current}"
            )));
        }
    };
    Ok(sum)
}

fn apply_update(doc: &mut Document, update: &Document) -> Result<(), StoreError> {
    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(StoreError::Backend(format!("{op} expects a document")));
        };
        match op.as_str() {
            "$inc" => {
                for (field, delta) in fields {
                    let next = add_numbers(doc.get(field), delta)?;
                    doc.insert(field.clone(), next);
                }
            }
            "$set" => {
                for (field, value) in fields {
                    if field == ID_FIELD {
                        return Err(StoreError::Backend("_id is immutable".to_string()));
                    }
                    doc.insert(field.clone(), value.clone());
                }
            }
            other => {
                return Err(StoreError::Backend(format!(
                    "unsupported update operator '{other}'"
                )));
            }
        }
    }
    Ok(())
}

/// `DocumentStore` kept entirely in memory.
///
/// Cloning produces a shared view of the same collections.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<DashMap<String, MemoryCollection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection (0 if it does not exist).
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.documents.len())
            .unwrap_or(0)
    }

    fn insert_one_sync(&self, collection: &str, document: Document) -> Result<InsertedOne, StoreError> {
        let mut coll = self.collections.entry(collection.to_string()).or_default();
        let inserted_id = coll.insert(document)?;
        Ok(InsertedOne {
            inserted_id,
            acknowledged: true,
        })
    }

    fn insert_many_sync(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<InsertedMany, StoreError> {
        let mut coll = self.collections.entry(collection.to_string()).or_default();
        let mut inserted_ids = Vec::with_capacity(documents.len());
        for doc in documents {
            inserted_ids.push(coll.insert(doc)?);
        }
        Ok(InsertedMany {
            inserted_ids,
            acknowledged: true,
        })
    }

    fn create_index_sync(&self, collection: &str, fields: &[String], unique: bool) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Err(StoreError::Backend("index requires at least one field".to_string()));
        }
        let mut coll = self.collections.entry(collection.to_string()).or_default();
        if !unique || coll.unique_indexes.iter().any(|idx| idx.as_slice() == fields) {
            return Ok(());
        }

        let mut seen: Vec<Vec<Bson>> = Vec::with_capacity(coll.documents.len());
        for doc in &coll.documents {
            let key = index_key(doc, fields);
            if seen.contains(&key) {
                return Err(StoreError::Constraint(format!(
                    "existing documents duplicate ({}): {:?}",
                    fields.join(", "),
                    key
                )));
            }
            seen.push(key);
        }

        coll.unique_indexes.push(fields.to_vec());
        Ok(())
    }

    fn find_one_and_update_sync(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        return_after: bool,
    ) -> Result<Option<Document>, StoreError> {
        let Some(mut coll) = self.collections.get_mut(collection) else {
            return Ok(None);
        };

        let mut position = None;
        for (pos, doc) in coll.documents.iter().enumerate() {
            if matches(doc, filter)? {
                position = Some(pos);
                break;
            }
        }
        let Some(pos) = position else {
            return Ok(None);
        };

        let before = coll.documents[pos].clone();
        let mut after = before.clone();
        apply_update(&mut after, update)?;
        coll.check_unique(&after, Some(pos))?;
        coll.documents[pos] = after.clone();

        Ok(Some(if return_after { after } else { before }))
    }

    fn delete_many_sync(&self, collection: &str, filter: &Document) -> Result<u64, StoreError> {
        let Some(mut coll) = self.collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut doomed = Vec::with_capacity(coll.documents.len());
        for doc in &coll.documents {
            doomed.push(matches(doc, filter)?);
        }
        let deleted = doomed.iter().filter(|d| **d).count() as u64;

        let mut doomed = doomed.into_iter();
        coll.documents.retain(|_| !doomed.next().unwrap_or(false));
        Ok(deleted)
    }

    fn find_sync(&self, collection: &str, filter: &Document, limit: Option<i64>) -> Result<Vec<Document>, StoreError> {
        let Some(coll) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let limit = match limit {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            _ => usize::MAX,
        };
        let mut found = Vec::new();
        for doc in &coll.documents {
            if found.len() >= limit {
                break;
            }
            if matches(doc, filter)? {
                found.push(doc.clone());
            }
        }
        Ok(found)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.collections.iter().map(|c| c.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertedOne, StoreError> {
        self.insert_one_sync(collection, document)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<InsertedMany, StoreError> {
        self.insert_many_sync(collection, documents)
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), StoreError> {
        self.collections.remove(collection);
        Ok(())
    }

    async fn create_index(&self, collection: &str, fields: &[String], unique: bool) -> Result<(), StoreError> {
        self.create_index_sync(collection, fields, unique)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        return_after: bool,
    ) -> Result<Option<Document>, StoreError> {
        self.find_one_and_update_sync(collection, &filter, &update, return_after)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, StoreError> {
        self.delete_many_sync(collection, &filter)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        self.find_sync(collection, &filter, limit)
    }
}
