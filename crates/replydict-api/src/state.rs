//! Application state wiring configuration and services together.
//!
//! AppState holds the loaded configuration. Stores are connected on demand so
//! that `kw` commands do not need MongoDB and `doc` commands do not need
//! PostgreSQL.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use replydict_core::document::collection::SequencedCollection;
use replydict_core::service::keyword::KeywordService;
use replydict_infra::config::{load_global_config, resolve_data_dir};
use replydict_infra::mongo::store::MongoDocumentStore;
use replydict_infra::postgres::keyword::PgKeywordRepository;
use replydict_infra::postgres::pool::PgDatabasePool;
use replydict_types::config::GlobalConfig;
use replydict_types::document::CollectionSpec;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteKeywordService = KeywordService<PgKeywordRepository>;

pub type ConcreteCollection = SequencedCollection<MongoDocumentStore>;

/// Shared application state used by every CLI command.
pub struct AppState {
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory and load `config.toml` from it.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_global_config(&data_dir).await;
        tracing::debug!(data_dir = %data_dir.display(), collections = config.collections.len(), "configuration loaded");

        Ok(Self { config, data_dir })
    }

    /// Connect to PostgreSQL and wire the keyword service.
    pub async fn keyword_service(&self) -> anyhow::Result<ConcreteKeywordService> {
        let settings = &self.config.postgres;
        let pool = PgDatabasePool::new(&settings.url, settings.max_connections)
            .await
            .with_context(|| format!("Failed to connect to PostgreSQL at {}", settings.url))?;

        Ok(KeywordService::new(PgKeywordRepository::new(pool))
            .with_rank_limit(self.config.display.rank_limit))
    }

    /// Connect to the configured MongoDB database.
    pub async fn document_store(&self) -> anyhow::Result<Arc<MongoDocumentStore>> {
        let settings = &self.config.mongo;
        let store = MongoDocumentStore::connect(&settings.uri, &settings.database)
            .await
            .with_context(|| format!("Failed to connect to MongoDB at {}", settings.uri))?;
        Ok(Arc::new(store))
    }

    /// Open a collection only if it already exists in the database.
    pub async fn existing_collection(&self, name: &str) -> anyhow::Result<Option<ConcreteCollection>> {
        let spec = self.collection_spec(name);
        let store = self.document_store().await?;

        SequencedCollection::open_existing(store, &spec)
            .await
            .with_context(|| format!("Failed to open collection '{name}'"))
    }

    fn collection_spec(&self, name: &str) -> CollectionSpec {
        self.config
            .collection(name)
            .cloned()
            .unwrap_or_else(|| CollectionSpec::sequenced(name))
    }

    /// Open a collection, declaring it on first use.
    ///
    /// Collections missing from `config.toml` are opened as sequenced with no
    /// extra index columns.
    pub async fn collection(&self, name: &str) -> anyhow::Result<ConcreteCollection> {
        let spec = self.collection_spec(name);
        let store = self.document_store().await?;

        SequencedCollection::open(store, &spec)
            .await
            .with_context(|| format!("Failed to open collection '{name}'"))
    }
}
