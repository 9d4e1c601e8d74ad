//! Per-user knowledge base: chunk sequence plus derived vector index.

use crate::embeddings::EmbeddingProvider;
use crate::store::{ChunkStore, PreparedDocument};
use crate::types::{Chunk, KnowledgeStats, Metadata, RetrievalResult};
use crate::vector_index::{FlatIndex, VectorIndex};
use chrono::{DateTime, Utc};
use recall_core::AppResult;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A knowledge base shared by every operation for one user.
///
/// Mutation and index reads both happen under this one exclusive lock.
pub type SharedKnowledgeBase = Arc<Mutex<KnowledgeBase>>;

/// Acquire a knowledge base lock.
///
/// Mutations are all-or-nothing before the lock is released, so a poisoned
/// lock still guards a consistent knowledge base and is recovered.
pub fn lock(kb: &Mutex<KnowledgeBase>) -> MutexGuard<'_, KnowledgeBase> {
    kb.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One user's knowledge base.
///
/// Invariant: when `index` is present it holds exactly the embeddings of
/// `store`, in the same order. Every mutation of `store` rebuilds it.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    store: ChunkStore,
    index: Option<FlatIndex>,
    last_ingested_at: Option<DateTime<Utc>>,
}

impl KnowledgeBase {
    /// Create an empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this knowledge base for shared use.
    pub fn into_shared(self) -> SharedKnowledgeBase {
        Arc::new(Mutex::new(self))
    }

    /// Build a knowledge base from an existing chunk sequence and index it.
    pub fn from_chunks(chunks: Vec<Chunk>) -> AppResult<Self> {
        let mut kb = Self {
            store: ChunkStore::from_chunks(chunks)?,
            index: None,
            last_ingested_at: None,
        };
        kb.rebuild_index()?;
        Ok(kb)
    }

    /// Segment, embed and append a document, then rebuild the index.
    ///
    /// Returns the number of chunks appended. On an embedding failure the
    /// knowledge base is left unchanged.
    pub async fn add_document(
        &mut self,
        provider: &dyn EmbeddingProvider,
        text: &str,
        metadata: &Metadata,
    ) -> AppResult<usize> {
        let prepared = PreparedDocument::embed(provider, text, metadata).await?;
        self.append_prepared(prepared)
    }

    /// Append an already-embedded document and rebuild the index.
    pub fn append_prepared(&mut self, document: PreparedDocument) -> AppResult<usize> {
        let appended = self.store.append(document)?;

        if appended > 0 {
            self.rebuild_index()?;
            self.last_ingested_at = Some(Utc::now());
        }

        tracing::debug!(
            "Appended {} chunks ({} total)",
            appended,
            self.store.len()
        );

        Ok(appended)
    }

    /// Fully rebuild the vector index from the current chunk sequence.
    pub fn rebuild_index(&mut self) -> AppResult<()> {
        self.index = FlatIndex::rebuild(self.store.chunks())?;
        Ok(())
    }

    /// Top-k chunks for a query embedding, best first.
    ///
    /// An absent index (no chunks) yields no results rather than an error.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<RetrievalResult<'_>>> {
        let Some(index) = self.index() else {
            return Ok(Vec::new());
        };

        let chunks = self.store.chunks();
        let hits = index.search(query_embedding, top_k)?;

        Ok(hits
            .into_iter()
            .filter_map(|(position, similarity)| {
                chunks
                    .get(position)
                    .map(|chunk| RetrievalResult { chunk, similarity })
            })
            .collect())
    }

    /// The current index, if one is built.
    pub fn index(&self) -> Option<&dyn VectorIndex> {
        self.index.as_ref().map(|i| i as &dyn VectorIndex)
    }

    pub fn chunks(&self) -> &[Chunk] {
        self.store.chunks()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.store.dimensions()
    }

    pub fn stats(&self) -> KnowledgeStats {
        KnowledgeStats {
            chunk_count: self.store.len(),
            document_count: self.store.document_count(),
            dimensions: self.store.dimensions(),
            indexed: self.index.is_some(),
            last_ingested_at: self.last_ingested_at,
        }
    }
}
