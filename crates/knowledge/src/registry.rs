//! Per-process registry of per-user knowledge bases.
//!
//! Each active user has one [`SharedKnowledgeBase`]. The map is guarded by its
//! own lock, held only for lookups and inserts; all knowledge base work
//! happens under the per-user lock, and embedding happens outside both.

use crate::blob::{BlobStore, MemoryBlobStore, SqliteBlobStore};
use crate::config::{KnowledgeConfig, StorageBackend};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::knowledge_base::{self, KnowledgeBase, SharedKnowledgeBase};
use crate::persistence::PersistenceAdapter;
use crate::retrieval::{RetrievalConfig, RetrievalEngine, RetrievedContext};
use crate::store::PreparedDocument;
use crate::types::{KnowledgeStats, Metadata, ScoredChunk};
use recall_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of active users' knowledge bases.
#[derive(Debug)]
pub struct KnowledgeRegistry {
    bases: RwLock<HashMap<String, SharedKnowledgeBase>>,
    provider: Arc<dyn EmbeddingProvider>,
    engine: RetrievalEngine,
    persistence: Option<PersistenceAdapter>,
}

impl KnowledgeRegistry {
    /// Create a registry.
    ///
    /// Without a persistence adapter every user starts empty and `persist`
    /// and `restore` fail with a configuration error.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        retrieval: RetrievalConfig,
        persistence: Option<PersistenceAdapter>,
    ) -> Self {
        Self {
            bases: RwLock::new(HashMap::new()),
            engine: RetrievalEngine::new(provider.clone(), retrieval),
            provider,
            persistence,
        }
    }

    /// Build the embedder, blob store and registry described by `config`.
    pub fn from_config(config: &KnowledgeConfig, state_dir: &Path) -> AppResult<Self> {
        config.validate()?;

        let provider = create_provider(&config.embedding)?;

        let blob_store: Arc<dyn BlobStore> = match config.storage.backend {
            StorageBackend::Sqlite => {
                Arc::new(SqliteBlobStore::open(&config.blob_path(state_dir))?)
            }
            StorageBackend::Memory => Arc::new(MemoryBlobStore::new()),
        };

        let persistence = PersistenceAdapter::new(blob_store, provider.clone());

        tracing::debug!(
            "Knowledge registry using provider '{}' ({} dims), {:?} storage",
            provider.provider_name(),
            provider.dimensions(),
            config.storage.backend
        );

        Ok(Self::new(
            provider,
            config.retrieval.clone(),
            Some(persistence),
        ))
    }

    /// Ingest one document for `user_id`, returning the number of chunks added.
    ///
    /// Segments are embedded before the user's lock is taken; on an embedding
    /// failure the knowledge base is unchanged.
    pub async fn ingest(&self, user_id: &str, text: &str, metadata: &Metadata) -> AppResult<usize> {
        let kb = self.get_or_load(user_id).await?;

        let prepared = PreparedDocument::embed(self.provider.as_ref(), text, metadata).await?;
        let appended = knowledge_base::lock(&kb).append_prepared(prepared)?;

        tracing::info!("Ingested {} chunks for user '{}'", appended, user_id);
        Ok(appended)
    }

    /// Attributed context for `query` from `user_id`'s documents.
    pub async fn retrieve_context(
        &self,
        user_id: &str,
        query: &str,
        max_chars: Option<usize>,
    ) -> AppResult<String> {
        let kb = self.get_or_load(user_id).await?;
        self.engine.get_context(&kb, query, max_chars).await
    }

    /// Context string plus the chunks behind it, from a single search.
    pub async fn retrieve_with_context(
        &self,
        user_id: &str,
        query: &str,
        max_chars: Option<usize>,
    ) -> AppResult<RetrievedContext> {
        let kb = self.get_or_load(user_id).await?;
        self.engine.retrieve_with_context(&kb, query, max_chars).await
    }

    /// Relevant chunks for `query`, best first.
    pub async fn retrieve(&self, user_id: &str, query: &str) -> AppResult<Vec<ScoredChunk>> {
        let kb = self.get_or_load(user_id).await?;
        self.engine.retrieve(&kb, query).await
    }

    /// Save `user_id`'s knowledge base, returning the blob id.
    ///
    /// A failed write is returned as an error; the in-memory knowledge base is
    /// unaffected and remains usable.
    pub async fn persist(&self, user_id: &str) -> AppResult<String> {
        let persistence = self.persistence()?;
        let kb = self.get_or_load(user_id).await?;
        persistence.save(user_id, &kb).await
    }

    /// Reload `user_id`'s knowledge base from storage, replacing what is in memory.
    ///
    /// Returns the number of chunks loaded.
    pub async fn restore(&self, user_id: &str) -> AppResult<usize> {
        let persistence = self.persistence()?;
        let loaded = persistence.load(user_id).await?;
        let count = loaded.len();

        let existing = self.lookup(user_id);
        match existing {
            // Swap contents so handles already given out see the restored state
            Some(kb) => *knowledge_base::lock(&kb) = loaded,
            None => {
                self.insert(user_id, loaded.into_shared());
            }
        }

        tracing::info!("Restored {} chunks for user '{}'", count, user_id);
        Ok(count)
    }

    pub async fn stats(&self, user_id: &str) -> AppResult<KnowledgeStats> {
        let kb = self.get_or_load(user_id).await?;
        let stats = knowledge_base::lock(&kb).stats();
        Ok(stats)
    }

    /// Drop `user_id`'s in-memory knowledge base. Stored records are kept.
    pub fn evict(&self, user_id: &str) -> bool {
        let removed = self
            .bases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id)
            .is_some();

        if removed {
            tracing::debug!("Evicted knowledge base for user '{}'", user_id);
        }
        removed
    }

    /// Users with a knowledge base in memory, sorted.
    pub fn active_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .bases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        users.sort();
        users
    }

    /// The user's knowledge base, loading it from storage on first access.
    pub async fn get_or_load(&self, user_id: &str) -> AppResult<SharedKnowledgeBase> {
        if let Some(kb) = self.lookup(user_id) {
            return Ok(kb);
        }

        let loaded = match &self.persistence {
            Some(persistence) => persistence.load(user_id).await?,
            None => KnowledgeBase::new(),
        };

        Ok(self.insert(user_id, loaded.into_shared()))
    }

    fn lookup(&self, user_id: &str) -> Option<SharedKnowledgeBase> {
        self.bases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    /// Insert unless another task got there first; the entry in the map wins.
    fn insert(&self, user_id: &str, kb: SharedKnowledgeBase) -> SharedKnowledgeBase {
        self.bases
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(user_id.to_string())
            .or_insert(kb)
            .clone()
    }

    fn persistence(&self) -> AppResult<&PersistenceAdapter> {
        self.persistence.as_ref().ok_or_else(|| {
            AppError::Config("No blob store configured for knowledge persistence".to_string())
        })
    }
}
