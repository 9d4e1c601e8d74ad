//! Vector index over chunk embeddings.
//!
//! The index is a derived structure: it is always rebuilt in full from the
//! current chunk sequence and never persisted. Similarity is the inner product
//! of L2-normalized vectors, i.e. cosine similarity.

use crate::types::Chunk;
use recall_core::{AppError, AppResult};
use std::cmp::Ordering;

/// Search interface for vector index backends.
///
/// Implementations must return hits in descending similarity, breaking ties by
/// ascending insertion position, and must treat vectors as L2-normalized. An
/// incremental index may replace [`FlatIndex`] as long as these hold.
pub trait VectorIndex: Send + Sync {
    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of every indexed vector.
    fn dimensions(&self) -> usize;

    /// Search for the top-k most similar vectors to the query embedding.
    ///
    /// Returns `(position, similarity)` pairs where `position` is the chunk's
    /// index in insertion order.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<(usize, f32)>>;
}

/// Exhaustive inner-product index over normalized vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    /// Row-major normalized vectors, `len * dimensions` values
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Rebuild the index from the complete chunk sequence.
    ///
    /// Returns `None` when there are no chunks: an empty knowledge base has no
    /// index. All embeddings must share one dimension.
    pub fn rebuild(chunks: &[Chunk]) -> AppResult<Option<Self>> {
        let Some(first) = chunks.first() else {
            tracing::debug!("No chunks to index, index is absent");
            return Ok(None);
        };

        let dimensions = first.embedding.len();
        let mut vectors = Vec::with_capacity(chunks.len() * dimensions);

        for (position, chunk) in chunks.iter().enumerate() {
            if chunk.embedding.len() != dimensions {
                return Err(AppError::Knowledge(format!(
                    "Chunk {} has {} dimensions, index expects {}",
                    position,
                    chunk.embedding.len(),
                    dimensions
                )));
            }
            vectors.extend(normalize(&chunk.embedding));
        }

        tracing::debug!(
            "Rebuilt vector index: {} vectors of dimension {}",
            chunks.len(),
            dimensions
        );

        Ok(Some(Self {
            dimensions,
            vectors,
        }))
    }

    fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.chunks_exact(self.dimensions.max(1))
    }
}

impl VectorIndex for FlatIndex {
    fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.vectors.len() / self.dimensions
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<(usize, f32)>> {
        if top_k == 0 {
            return Err(AppError::Knowledge(
                "top_k must be a positive integer".to_string(),
            ));
        }

        if query_embedding.len() != self.dimensions {
            return Err(AppError::Embedding(format!(
                "Query embedding has {} dimensions, index expects {}",
                query_embedding.len(),
                self.dimensions
            )));
        }

        let query = normalize(query_embedding);

        let mut scored: Vec<(usize, f32)> = self
            .rows()
            .enumerate()
            // Adding +0.0 folds -0.0 into +0.0 so equal scores tie under total_cmp
            .map(|(position, row)| (position, dot(&query, row) + 0.0))
            .collect();

        // Descending similarity, then earlier insertion first
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(top_k);

        tracing::debug!(
            "Index search returned {} of {} vectors (requested top-{})",
            scored.len(),
            self.len(),
            top_k
        );

        Ok(scored)
    }
}

/// Scale a vector to unit L2 length. Zero vectors are returned unchanged.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector.to_vec()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
