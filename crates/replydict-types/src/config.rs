//! Global configuration types for replydict.
//!
//! `GlobalConfig` represents the top-level `config.toml` that names the
//! document store and relational store, declares collections, and sets the
//! default sizes of formatted listings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::document::CollectionSpec;

/// Top-level configuration.
///
/// Loaded from `~/.replydict/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub mongo: MongoSettings,

    #[serde(default)]
    pub postgres: PostgresSettings,

    #[serde(default)]
    pub display: DisplaySettings,

    /// Declared document collections.
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,

    /// Display names by creator id, used when rendering keyword details.
    #[serde(default)]
    pub creator_names: HashMap<String, String>,
}

impl GlobalConfig {
    /// Look up a declared collection by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }
}

/// Document store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSettings {
    #[serde(default = "default_mongo_uri")]
    pub uri: String,

    #[serde(default = "default_mongo_database")]
    pub database: String,
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongo_database() -> String {
    "replydict".to_string()
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: default_mongo_uri(),
            database: default_mongo_database(),
        }
    }
}

/// Relational store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSettings {
    #[serde(default = "default_postgres_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_postgres_url() -> String {
    "postgres://localhost/replydict".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            url: default_postgres_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Sizes used when rendering keyword listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Entries shown in the limited version of a keyword list.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,

    /// Entries shown in the limited version of a detailed listing.
    #[serde(default = "default_info_limit")]
    pub info_limit: usize,

    /// Rows fetched for ranking queries.
    #[serde(default = "default_rank_limit")]
    pub rank_limit: i64,
}

fn default_list_limit() -> usize {
    25
}

fn default_info_limit() -> usize {
    2
}

fn default_rank_limit() -> i64 {
    1000
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
            info_limit: default_info_limit(),
            rank_limit: default_rank_limit(),
        }
    }
}
