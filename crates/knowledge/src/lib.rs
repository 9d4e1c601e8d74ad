//! Per-user knowledge store for retrieval-augmented generation.
//!
//! Documents are split into sentence-sized chunks, embedded, and kept in an
//! exact similarity index per user. Queries are answered with an attributed
//! context string bounded by a character budget, ready to be placed into a
//! language model prompt.
//!
//! The usual entry point is [`KnowledgeRegistry`]:
//!
//! ```no_run
//! # async fn run() -> recall_core::AppResult<()> {
//! use recall_knowledge::{KnowledgeConfig, KnowledgeRegistry, Metadata};
//!
//! let registry = KnowledgeRegistry::from_config(&KnowledgeConfig::default(), std::path::Path::new(".recall"))?;
//! registry.ingest("user-1", "The dog ran in the park.", &Metadata::new()).await?;
//! let context = registry.retrieve_context("user-1", "Tell me about dogs", None).await?;
//! registry.persist("user-1").await?;
//! # let _ = context;
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod knowledge_base;
pub mod persistence;
pub mod registry;
pub mod retrieval;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use blob::{BlobStore, MemoryBlobStore, SqliteBlobStore};
pub use config::{KnowledgeConfig, StorageBackend, StorageConfig};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use knowledge_base::{KnowledgeBase, SharedKnowledgeBase};
pub use persistence::PersistenceAdapter;
pub use registry::KnowledgeRegistry;
pub use retrieval::{RetrievalConfig, RetrievalEngine, RetrievedContext, NO_RELEVANT_INFORMATION};
pub use types::{
    Chunk, KnowledgeStats, Metadata, ScoredChunk, META_FILENAME, META_SOURCE_ID,
    META_SOURCE_TYPE,
};
