//! Retrieval engine: query embedding, ranked search, threshold filtering and
//! context assembly under a character budget.

use crate::embeddings::{embed_one_checked, EmbeddingProvider};
use crate::knowledge_base::{self, KnowledgeBase};
use crate::types::{RetrievalResult, ScoredChunk};
use recall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Returned when no chunk clears the similarity threshold, including when the
/// knowledge base is empty. Downstream consumers compare against this exactly.
pub const NO_RELEVANT_INFORMATION: &str =
    "No relevant information found in the provided documents.";

/// Introduces the snippets of a non-empty context.
pub const CONTEXT_HEADER: &str = "Relevant information from uploaded documents:\n\n";

/// Number of candidates fetched from the index per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Results at or below this similarity are treated as noise.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.3;

/// Character budget used when the caller does not give one.
pub const DEFAULT_MAX_CHARS: usize = 2000;

/// Retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_similarity: f32,
    pub max_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_similarity: DEFAULT_MIN_SIMILARITY,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.top_k must be a positive integer".to_string(),
            ));
        }
        if self.max_chars == 0 {
            return Err(AppError::Config(
                "retrieval.max_chars must be positive".to_string(),
            ));
        }
        if !self.min_similarity.is_finite() {
            return Err(AppError::Config(format!(
                "retrieval.min_similarity must be a finite number, got {}",
                self.min_similarity
            )));
        }
        Ok(())
    }
}

/// Result of [`RetrievalEngine::retrieve_with_context`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedContext {
    /// Attributed context, or [`NO_RELEVANT_INFORMATION`]
    pub context: String,

    /// Relevant chunks, best first
    pub results: Vec<ScoredChunk>,
}

/// Orchestrates query embedding, index search, filtering and assembly.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Relevant chunks for `query`, best first, as owned copies.
    pub async fn retrieve(&self, kb: &Mutex<KnowledgeBase>, query: &str) -> AppResult<Vec<ScoredChunk>> {
        // Embedding touches no shared state and runs outside the lock
        let query_embedding = embed_one_checked(self.provider.as_ref(), query).await?;

        let guard = knowledge_base::lock(kb);
        let results = self.relevant(&guard, &query_embedding)?;
        Ok(results.into_iter().map(ScoredChunk::from).collect())
    }

    /// Build the attributed context string for `query`.
    ///
    /// `max_chars` falls back to the configured default and must be positive.
    pub async fn get_context(
        &self,
        kb: &Mutex<KnowledgeBase>,
        query: &str,
        max_chars: Option<usize>,
    ) -> AppResult<String> {
        Ok(self.retrieve_with_context(kb, query, max_chars).await?.context)
    }

    /// Context string and the relevant chunks it was built from.
    ///
    /// Both come from one query embedding and one search under the lock, so
    /// they always agree.
    pub async fn retrieve_with_context(
        &self,
        kb: &Mutex<KnowledgeBase>,
        query: &str,
        max_chars: Option<usize>,
    ) -> AppResult<RetrievedContext> {
        let max_chars = max_chars.unwrap_or(self.config.max_chars);
        if max_chars == 0 {
            return Err(AppError::Knowledge(
                "max_chars must be positive".to_string(),
            ));
        }

        let query_embedding = embed_one_checked(self.provider.as_ref(), query).await?;

        let guard = knowledge_base::lock(kb);
        let results = self.relevant(&guard, &query_embedding)?;

        if results.is_empty() {
            tracing::info!(
                "No relevant chunks found (none above {:.2} similarity)",
                self.config.min_similarity
            );
        } else {
            tracing::info!(
                "Retrieved {} relevant chunks (top score: {:.3})",
                results.len(),
                results[0].similarity
            );
        }

        Ok(RetrievedContext {
            context: assemble_context(&results, max_chars),
            results: results.into_iter().map(ScoredChunk::from).collect(),
        })
    }

    fn relevant<'a>(
        &self,
        kb: &'a KnowledgeBase,
        query_embedding: &[f32],
    ) -> AppResult<Vec<RetrievalResult<'a>>> {
        let results = kb.search(query_embedding, self.config.top_k)?;

        if !results.is_empty() {
            let scores: Vec<f32> = results.iter().map(|r| r.similarity).collect();
            tracing::debug!("Candidate scores before filtering: {:?}", scores);
        }

        Ok(filter_relevant(results, self.config.min_similarity))
    }
}

/// Keep results strictly above `min_similarity`, preserving rank order.
pub fn filter_relevant(results: Vec<RetrievalResult<'_>>, min_similarity: f32) -> Vec<RetrievalResult<'_>> {
    results
        .into_iter()
        .filter(|r| r.similarity > min_similarity)
        .collect()
}

/// Assemble ranked results into a context of at most `max_chars` characters.
///
/// The header counts toward the budget. Snippets are added whole in rank
/// order; the first one that does not fit ends assembly. With no snippet the
/// result is [`NO_RELEVANT_INFORMATION`].
pub fn assemble_context(results: &[RetrievalResult<'_>], max_chars: usize) -> String {
    let mut context = String::from(CONTEXT_HEADER);
    let mut current_length = CONTEXT_HEADER.chars().count();
    let mut included = 0usize;

    for result in results {
        let snippet = format!("From {}: {}\n\n", result.chunk.filename(), result.chunk.text);
        let snippet_length = snippet.chars().count();

        if current_length + snippet_length > max_chars {
            tracing::debug!(
                "Context budget of {} chars reached after {} snippets",
                max_chars,
                included
            );
            break;
        }

        context.push_str(&snippet);
        current_length += snippet_length;
        included += 1;
    }

    if included == 0 {
        return NO_RELEVANT_INFORMATION.to_string();
    }

    context.trim_end().to_string()
}
