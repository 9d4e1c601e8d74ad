//! Knowledge store type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-document metadata shared by every chunk produced from that document.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key holding the display name of the source document.
pub const META_FILENAME: &str = "filename";

/// Metadata key holding the source kind ("text", "image", "document", ...).
pub const META_SOURCE_TYPE: &str = "type";

/// Metadata key holding the upstream identifier of the source payload.
pub const META_SOURCE_ID: &str = "file_id";

/// Attribution used when a chunk's metadata carries no filename.
pub const UNKNOWN_FILENAME: &str = "unknown file";

/// A retrievable unit of ingested text, roughly one sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Text content (trimmed)
    pub text: String,

    /// Metadata copied verbatim from the ingesting caller
    pub metadata: Metadata,

    /// Position among the surviving segments of the source document (0-based)
    pub sequence_id: u32,

    /// Embedding as produced by the embedder (not normalized)
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Filename used for attribution, falling back to [`UNKNOWN_FILENAME`].
    pub fn filename(&self) -> &str {
        self.metadata
            .get(META_FILENAME)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_FILENAME)
    }
}

/// Segment produced by the chunker, before it has been embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position among surviving segments
    pub sequence_id: u32,

    /// Trimmed segment text
    pub text: String,
}

/// A search hit borrowing the chunk it refers to.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalResult<'a> {
    pub chunk: &'a Chunk,
    pub similarity: f32,
}

/// Owned copy of a search hit, for callers that outlive the knowledge base lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub metadata: Metadata,
    pub sequence_id: u32,
    pub similarity: f32,
}

impl From<RetrievalResult<'_>> for ScoredChunk {
    fn from(result: RetrievalResult<'_>) -> Self {
        Self {
            text: result.chunk.text.clone(),
            metadata: result.chunk.metadata.clone(),
            sequence_id: result.chunk.sequence_id,
            similarity: result.similarity,
        }
    }
}

/// Statistics for one user's knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStats {
    /// Number of chunks
    pub chunk_count: usize,

    /// Number of ingested documents that produced at least one chunk
    pub document_count: usize,

    /// Embedding dimension, once known
    pub dimensions: Option<usize>,

    /// Whether a vector index is currently built
    pub indexed: bool,

    /// Last successful ingestion in this process
    pub last_ingested_at: Option<DateTime<Utc>>,
}
