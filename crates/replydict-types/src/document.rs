//! Sequenced collection types.
//!
//! A sequenced collection stamps every inserted document with an
//! application-assigned `_seq` integer drawn from a per-collection counter
//! record. The counter records live in their own collection, keyed by the
//! owning collection's name.

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Name of the collection holding one counter record per sequenced collection.
pub const COUNTER_COLLECTION: &str = "counter";

/// Field of a counter record holding the owning collection's name.
pub const COUNTER_KEY_FIELD: &str = "_id";

/// Field carrying the sequence value, both in counter records and documents.
pub const SEQUENCE_FIELD: &str = "_seq";

/// Reported in place of a sequence value when none was assigned. Never persisted.
pub const NOT_EXIST_SEQ_ID: i64 = -1;

/// Declaration of a logical collection.
///
/// Usually read from `[[collections]]` in `config.toml`. `index_columns` is
/// kept as a raw value so a malformed declaration can be rejected when the
/// collection is opened rather than silently coerced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionSpec {
    pub name: String,

    #[serde(default = "default_sequenced")]
    pub sequenced: bool,

    #[serde(default)]
    pub index_columns: Option<serde_json::Value>,
}

fn default_sequenced() -> bool {
    true
}

impl CollectionSpec {
    /// Declare a sequenced collection without extra index columns.
    pub fn sequenced(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequenced: true,
            index_columns: None,
        }
    }

    /// Declare a collection that does not receive sequence values.
    pub fn unsequenced(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequenced: false,
            index_columns: None,
        }
    }

    /// Attach index columns given as plain names.
    pub fn with_index_columns<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let columns: Vec<serde_json::Value> = columns
            .into_iter()
            .map(|c| serde_json::Value::String(c.into()))
            .collect();
        self.index_columns = Some(serde_json::Value::Array(columns));
        self
    }

    /// Resolve the declared index columns.
    ///
    /// Absent or `null` means no columns. Anything other than an array of
    /// strings is a [`StoreError::Config`].
    pub fn resolved_index_columns(&self) -> Result<Vec<String>, StoreError> {
        match &self.index_columns {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) if !s.is_empty() => Ok(s.clone()),
                    other => Err(StoreError::Config(format!(
                        "index column must be a non-empty string, got {other}"
                    ))),
                })
                .collect(),
            Some(other) => Err(StoreError::Config(format!(
                "index columns must be a list of column names, got {other}"
            ))),
        }
    }
}

/// Insert acknowledgment extended with the allocated sequence value.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    pub inserted_id: Bson,
    pub acknowledged: bool,
    /// Allocated `_seq`, or [`NOT_EXIST_SEQ_ID`] for an unsequenced collection.
    pub inserted_seq_id: i64,
}

/// Batch insert acknowledgment extended with one sequence value per input document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    /// Inserted ids in input order.
    pub inserted_ids: Vec<Bson>,
    pub acknowledged: bool,
    /// Allocated `_seq` values in input order.
    pub inserted_seq_ids: Vec<i64>,
}
