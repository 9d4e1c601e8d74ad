//! Embedding capability for the knowledge store.
//!
//! Providers map text to fixed-dimension vectors. Everything the store accepts
//! from a provider goes through [`embed_checked`], so a misbehaving provider
//! surfaces as an embedding error instead of corrupting a knowledge base.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use recall_core::{AppError, AppResult};

/// Embed `texts` and verify the provider's output shape.
///
/// Fails with [`AppError::Embedding`] when the batch size differs from the
/// input, a vector's length differs from `provider.dimensions()`, or a value
/// is not finite.
pub async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    tracing::debug!(
        "Embedding {} texts using provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let embeddings = provider.embed_batch(texts).await?;
    validate_batch(texts.len(), provider.dimensions(), &embeddings)?;

    Ok(embeddings)
}

/// Embed one text with the same checks as [`embed_checked`].
pub async fn embed_one_checked(provider: &dyn EmbeddingProvider, text: &str) -> AppResult<Vec<f32>> {
    let mut embeddings = embed_checked(provider, &[text.to_string()]).await?;
    embeddings
        .pop()
        .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
}

fn validate_batch(expected: usize, dimensions: usize, embeddings: &[Vec<f32>]) -> AppResult<()> {
    if embeddings.len() != expected {
        return Err(AppError::Embedding(format!(
            "Provider returned {} embeddings for {} texts",
            embeddings.len(),
            expected
        )));
    }

    for (i, embedding) in embeddings.iter().enumerate() {
        if embedding.len() != dimensions {
            return Err(AppError::Embedding(format!(
                "Embedding {} has {} dimensions, expected {}",
                i,
                embedding.len(),
                dimensions
            )));
        }

        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(AppError::Embedding(format!(
                "Embedding {} contains non-finite values",
                i
            )));
        }
    }

    Ok(())
}
