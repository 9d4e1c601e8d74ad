//! Deterministic embedders and blob stores for scenario tests.

use crate::blob::BlobStore;
use crate::embeddings::EmbeddingProvider;
use recall_core::{AppError, AppResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Fixed-vocabulary embedder: one axis per keyword, counting occurrences.
///
/// Words are lowercased and a trailing plural "s" is dropped, so "dogs"
/// lands on the "dog" axis.
#[derive(Debug)]
pub struct KeywordProvider {
    vocabulary: Vec<&'static str>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl KeywordProvider {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn animals() -> Self {
        Self::new(&["dog", "park", "cat", "mat", "elephant", "large", "mammal"])
    }

    /// Make every later call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed_batch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let stem = word.strip_suffix('s').unwrap_or(word);
            if let Some(axis) = self.vocabulary.iter().position(|v| *v == stem || *v == word) {
                vector[axis] += 1.0;
            }
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Embedding("embedder unavailable".to_string()));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Blob store whose writes always fail and which never finds anything.
#[derive(Debug, Default)]
pub struct FailingBlobStore;

#[async_trait::async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, name: &str, _bytes: Vec<u8>) -> AppResult<String> {
        Err(AppError::Persistence(format!("upload of '{}' rejected", name)))
    }

    async fn find(&self, _name: &str) -> AppResult<Option<String>> {
        Ok(None)
    }

    async fn get(&self, id: &str) -> AppResult<Vec<u8>> {
        Err(AppError::Persistence(format!("blob '{}' unavailable", id)))
    }
}

pub const ANIMALS: &str = "The cat sat on the mat. The dog ran in the park. \
                           Elephants are large mammals that live in herds.";
