//! Knowledge base persistence through a blob store.
//!
//! One JSON record per user, named `knowledge_base_<user_id>.json`:
//!
//! ```json
//! { "documents": [ { "text": "...", "metadata": { "filename": "a.txt" }, "sequence_id": 0 } ] }
//! ```
//!
//! Only chunk text, metadata and sequence ids are stored. Embeddings are
//! recomputed on load and the index is rebuilt from them.

use crate::blob::BlobStore;
use crate::embeddings::{embed_checked, EmbeddingProvider};
use crate::knowledge_base::{self, KnowledgeBase};
use crate::types::{Chunk, Metadata};
use recall_core::AppResult;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Stored form of one knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedKnowledgeBase {
    pub documents: Vec<PersistedChunk>,
}

/// Stored form of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedChunk {
    pub text: String,
    pub metadata: Metadata,
    pub sequence_id: u32,
}

impl PersistedKnowledgeBase {
    /// Snapshot the chunks of `kb` in append order.
    pub fn snapshot(kb: &KnowledgeBase) -> Self {
        Self {
            documents: kb
                .chunks()
                .iter()
                .map(|c| PersistedChunk {
                    text: c.text.clone(),
                    metadata: c.metadata.clone(),
                    sequence_id: c.sequence_id,
                })
                .collect(),
        }
    }
}

/// Blob name under which a user's knowledge base is stored.
pub fn blob_name(user_id: &str) -> String {
    format!("knowledge_base_{}.json", user_id)
}

/// Saves and loads knowledge bases.
#[derive(Debug, Clone)]
pub struct PersistenceAdapter {
    blob_store: Arc<dyn BlobStore>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl PersistenceAdapter {
    pub fn new(blob_store: Arc<dyn BlobStore>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            blob_store,
            provider,
        }
    }

    /// Upload the current state of `kb`, returning the new blob id.
    ///
    /// The record is snapshotted under the lock; the upload runs after it is
    /// released. A failed upload leaves the knowledge base untouched.
    pub async fn save(&self, user_id: &str, kb: &Mutex<KnowledgeBase>) -> AppResult<String> {
        let record = PersistedKnowledgeBase::snapshot(&knowledge_base::lock(kb));
        self.save_record(user_id, &record).await
    }

    /// Upload an already-snapshotted record.
    pub async fn save_record(
        &self,
        user_id: &str,
        record: &PersistedKnowledgeBase,
    ) -> AppResult<String> {
        let name = blob_name(user_id);
        let bytes = serde_json::to_vec(record)?;

        let id = self.blob_store.put(&name, bytes).await?;

        tracing::info!(
            "Persisted {} chunks for user '{}' as blob {}",
            record.documents.len(),
            user_id,
            id
        );

        Ok(id)
    }

    /// Load a user's knowledge base.
    ///
    /// A missing, unreadable or malformed record yields an empty knowledge
    /// base. An embedding failure while re-embedding is returned as an error.
    pub async fn load(&self, user_id: &str) -> AppResult<KnowledgeBase> {
        let Some(record) = self.fetch_record(user_id).await else {
            return Ok(KnowledgeBase::new());
        };

        if record.documents.is_empty() {
            return Ok(KnowledgeBase::new());
        }

        let texts: Vec<String> = record.documents.iter().map(|d| d.text.clone()).collect();
        let embeddings = embed_checked(self.provider.as_ref(), &texts).await?;

        let chunks: Vec<Chunk> = record
            .documents
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| Chunk {
                text: doc.text,
                metadata: doc.metadata,
                sequence_id: doc.sequence_id,
                embedding,
            })
            .collect();

        let kb = KnowledgeBase::from_chunks(chunks)?;

        tracing::info!(
            "Loaded knowledge base for user '{}' ({} chunks)",
            user_id,
            kb.len()
        );

        Ok(kb)
    }

    async fn fetch_record(&self, user_id: &str) -> Option<PersistedKnowledgeBase> {
        let name = blob_name(user_id);

        let id = match self.blob_store.find(&name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::debug!("No stored knowledge base for user '{}'", user_id);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to look up '{}': {}", name, e);
                return None;
            }
        };

        let bytes = match self.blob_store.get(&id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to download '{}' ({}): {}", name, id, e);
                return None;
            }
        };

        match serde_json::from_slice::<PersistedKnowledgeBase>(&bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    "Stored knowledge base '{}' is malformed, starting empty: {}",
                    name,
                    e
                );
                None
            }
        }
    }
}
