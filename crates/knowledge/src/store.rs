//! Ordered chunk storage for one user.

use crate::chunker;
use crate::embeddings::{embed_checked, EmbeddingProvider};
use crate::types::{Chunk, Metadata};
use recall_core::{AppError, AppResult};

/// A document that has been segmented and embedded but not yet appended.
///
/// Producing one touches no shared state, so it can be built without holding
/// the knowledge base lock.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    pub chunks: Vec<Chunk>,
}

impl PreparedDocument {
    /// Segment `text` and embed every surviving segment.
    ///
    /// The metadata is copied onto every chunk. A document with no surviving
    /// segments yields an empty preparation and makes no embedder call.
    pub async fn embed(
        provider: &dyn EmbeddingProvider,
        text: &str,
        metadata: &Metadata,
    ) -> AppResult<Self> {
        let segments = chunker::chunk_text(text);
        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let embeddings = embed_checked(provider, &texts).await?;

        let chunks = segments
            .into_iter()
            .zip(embeddings)
            .map(|(segment, embedding)| Chunk {
                text: segment.text,
                metadata: metadata.clone(),
                sequence_id: segment.sequence_id,
                embedding,
            })
            .collect();

        Ok(Self { chunks })
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Append-only, insertion-ordered chunk sequence with a fixed embedding dimension.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    dimensions: Option<usize>,
    document_count: usize,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every chunk of a document, or none of them.
    ///
    /// The first accepted embedding fixes the store's dimension; chunks that
    /// disagree with it are rejected before anything is appended.
    pub fn append(&mut self, document: PreparedDocument) -> AppResult<usize> {
        if document.is_empty() {
            return Ok(0);
        }

        let expected = self
            .dimensions
            .unwrap_or_else(|| document.chunks[0].embedding.len());

        if expected == 0 {
            return Err(AppError::Embedding(
                "Embeddings must have at least one dimension".to_string(),
            ));
        }

        if let Some(bad) = document
            .chunks
            .iter()
            .find(|c| c.embedding.len() != expected)
        {
            return Err(AppError::Embedding(format!(
                "Embedding has {} dimensions, knowledge base expects {}",
                bad.embedding.len(),
                expected
            )));
        }

        let appended = document.chunks.len();
        self.chunks.extend(document.chunks);
        self.dimensions = Some(expected);
        self.document_count += 1;

        Ok(appended)
    }

    /// Rebuild a store from a previously persisted chunk sequence.
    ///
    /// Document boundaries are recovered from `sequence_id` restarting at 0.
    pub fn from_chunks(chunks: Vec<Chunk>) -> AppResult<Self> {
        let mut store = Self::new();
        let mut current: Vec<Chunk> = Vec::new();

        for chunk in chunks {
            if chunk.sequence_id == 0 && !current.is_empty() {
                store.append(PreparedDocument {
                    chunks: std::mem::take(&mut current),
                })?;
            }
            current.push(chunk);
        }
        store.append(PreparedDocument { chunks: current })?;

        Ok(store)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;

    fn chunk(text: &str, sequence_id: u32, embedding: Vec<f32>) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: Metadata::new(),
            sequence_id,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_prepare_copies_metadata() {
        let provider = TrigramProvider::new(32);
        let mut metadata = Metadata::new();
        metadata.insert("filename".to_string(), "notes.txt".to_string());

        let prepared = PreparedDocument::embed(
            &provider,
            "Short. The first real sentence is here. The second real sentence follows.",
            &metadata,
        )
        .await
        .unwrap();

        assert_eq!(prepared.chunks.len(), 2);
        assert!(prepared.chunks.iter().all(|c| c.metadata == metadata));
        assert_eq!(prepared.chunks[1].sequence_id, 1);
        assert_eq!(prepared.chunks[0].embedding.len(), 32);
    }

    #[test]
    fn test_append_preserves_order_across_documents() {
        let mut store = ChunkStore::new();
        store
            .append(PreparedDocument {
                chunks: vec![chunk("a", 0, vec![1.0, 0.0]), chunk("b", 1, vec![0.0, 1.0])],
            })
            .unwrap();
        store
            .append(PreparedDocument {
                chunks: vec![chunk("c", 0, vec![1.0, 1.0])],
            })
            .unwrap();

        let texts: Vec<&str> = store.chunks().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(store.document_count(), 2);
        assert_eq!(store.dimensions(), Some(2));
    }

    #[test]
    fn test_append_rejects_dimension_change() {
        let mut store = ChunkStore::new();
        store
            .append(PreparedDocument {
                chunks: vec![chunk("a", 0, vec![1.0, 0.0])],
            })
            .unwrap();

        let result = store.append(PreparedDocument {
            chunks: vec![chunk("b", 0, vec![1.0, 0.0, 0.0])],
        });

        assert!(result.unwrap_err().is_embedding());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_append_is_all_or_nothing() {
        let mut store = ChunkStore::new();
        let result = store.append(PreparedDocument {
            chunks: vec![chunk("a", 0, vec![1.0, 0.0]), chunk("b", 1, vec![1.0])],
        });

        assert!(result.is_err());
        assert!(store.is_empty());
        assert_eq!(store.dimensions(), None);
    }

    #[test]
    fn test_from_chunks_counts_documents() {
        let store = ChunkStore::from_chunks(vec![
            chunk("a", 0, vec![1.0, 0.0]),
            chunk("b", 1, vec![0.0, 1.0]),
            chunk("c", 0, vec![1.0, 1.0]),
        ])
        .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.document_count(), 2);
        assert_eq!(store.chunks()[2].text, "c");
    }

    #[test]
    fn test_append_empty_document() {
        let mut store = ChunkStore::new();
        assert_eq!(store.append(PreparedDocument { chunks: vec![] }).unwrap(), 0);
        assert_eq!(store.document_count(), 0);
    }
}
