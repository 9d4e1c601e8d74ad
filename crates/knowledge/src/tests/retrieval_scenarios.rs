//! End-to-end ingest and retrieval through the registry.

#[cfg(test)]
mod tests {
    use crate::embeddings::providers::trigram::TrigramProvider;
    use crate::embeddings::EmbeddingProvider;
    use crate::knowledge_base::{self, KnowledgeBase};
    use crate::registry::KnowledgeRegistry;
    use crate::retrieval::{RetrievalConfig, CONTEXT_HEADER, NO_RELEVANT_INFORMATION};
    use crate::tests::support::{KeywordProvider, ANIMALS};
    use crate::types::{Metadata, META_FILENAME, META_SOURCE_TYPE};
    use std::sync::Arc;

    fn animals_metadata() -> Metadata {
        Metadata::from([
            (META_FILENAME.to_string(), "animals.txt".to_string()),
            (META_SOURCE_TYPE.to_string(), "text".to_string()),
        ])
    }

    fn registry_with(provider: Arc<dyn EmbeddingProvider>) -> KnowledgeRegistry {
        KnowledgeRegistry::new(provider, RetrievalConfig::default(), None)
    }

    #[tokio::test]
    async fn test_dog_question_finds_dog_sentence() {
        let registry = registry_with(Arc::new(KeywordProvider::animals()));

        let added = registry
            .ingest("u1", ANIMALS, &animals_metadata())
            .await
            .unwrap();
        assert_eq!(added, 3);

        let context = registry
            .retrieve_context("u1", "Tell me about dogs", None)
            .await
            .unwrap();
        assert_eq!(
            context,
            "Relevant information from uploaded documents:\n\n\
             From animals.txt: The dog ran in the park."
        );

        let hits = registry.retrieve("u1", "Tell me about dogs").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].similarity > 0.7);
        assert_eq!(hits[0].sequence_id, 1);
    }

    #[tokio::test]
    async fn test_dog_question_with_trigram_embedder() {
        let registry = registry_with(Arc::new(TrigramProvider::new(384)));
        registry
            .ingest("u1", ANIMALS, &animals_metadata())
            .await
            .unwrap();

        let context = registry
            .retrieve_context("u1", "Tell me about dogs", None)
            .await
            .unwrap();
        assert!(context.starts_with(CONTEXT_HEADER));
        assert!(context.contains("From animals.txt: The dog ran in the park."));
        assert!(!context.contains("Elephants"));
    }

    #[tokio::test]
    async fn test_empty_knowledge_base_returns_sentinel() {
        let registry = registry_with(Arc::new(KeywordProvider::animals()));

        let context = registry
            .retrieve_context("nobody", "dogs", None)
            .await
            .unwrap();
        assert_eq!(context, NO_RELEVANT_INFORMATION);
    }

    #[tokio::test]
    async fn test_unrelated_query_returns_sentinel() {
        let registry = registry_with(Arc::new(KeywordProvider::animals()));
        registry
            .ingest("u1", ANIMALS, &animals_metadata())
            .await
            .unwrap();

        let context = registry
            .retrieve_context("u1", "quantum chromodynamics", None)
            .await
            .unwrap();
        assert_eq!(context, NO_RELEVANT_INFORMATION);
    }

    #[tokio::test]
    async fn test_budget_bounds_context() {
        let registry = registry_with(Arc::new(KeywordProvider::animals()));
        registry
            .ingest(
                "u1",
                "The dog ran in the park. A dog slept near the big park gate.",
                &animals_metadata(),
            )
            .await
            .unwrap();

        for max_chars in [1, 60, 100, 120, 2000] {
            let context = registry
                .retrieve_context("u1", "dog park", Some(max_chars))
                .await
                .unwrap();
            assert!(
                context == NO_RELEVANT_INFORMATION || context.chars().count() <= max_chars,
                "context of {} chars exceeds budget {}",
                context.chars().count(),
                max_chars
            );
        }

        assert!(registry
            .retrieve_context("u1", "dog park", Some(0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_missing_filename_is_attributed_to_unknown_file() {
        let registry = registry_with(Arc::new(KeywordProvider::animals()));
        registry
            .ingest("u1", "The cat sat on the mat.", &Metadata::new())
            .await
            .unwrap();

        let context = registry
            .retrieve_context("u1", "cats", None)
            .await
            .unwrap();
        assert!(context.ends_with("From unknown file: The cat sat on the mat."));
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_knowledge_base_unchanged() {
        let provider = Arc::new(KeywordProvider::animals());
        let registry = registry_with(provider.clone());

        registry
            .ingest("u1", "The dog ran in the park.", &animals_metadata())
            .await
            .unwrap();
        let before = registry.retrieve_context("u1", "dogs", None).await.unwrap();

        provider.set_failing(true);
        let err = registry
            .ingest("u1", "The cat sat on the mat.", &animals_metadata())
            .await
            .unwrap_err();
        assert!(err.is_embedding());
        assert_eq!(registry.stats("u1").await.unwrap().chunk_count, 1);

        provider.set_failing(false);
        let after = registry.retrieve_context("u1", "dogs", None).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_document_without_segments_skips_embedder() {
        let provider = Arc::new(KeywordProvider::animals());
        let mut kb = KnowledgeBase::new();

        let added = kb
            .add_document(provider.as_ref(), "Too short. Tiny.", &Metadata::new())
            .await
            .unwrap();

        assert_eq!(added, 0);
        assert_eq!(provider.calls(), 0);
        assert!(kb.index().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_ingest_for_one_user() {
        let registry = Arc::new(registry_with(Arc::new(KeywordProvider::animals())));

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let text = format!("The dog number {} ran in the park.", i);
                registry.ingest("shared", &text, &Metadata::new()).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }

        let kb = registry.get_or_load("shared").await.unwrap();
        let guard = knowledge_base::lock(&kb);
        assert_eq!(guard.len(), 8);
        assert_eq!(guard.index().unwrap().len(), 8);
        assert_eq!(guard.stats().document_count, 8);
    }
}
