// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval orchestration: candidates, similarity search, rerank, policy.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use mnemo_config::model::RetrievalConfig;
use mnemo_core::types::{ConversationTurn, ConversationVectorRecord};

use crate::metrics;
use crate::reranker::{ConversationReranker, similarity_order};
use crate::types::{
    ContextEntry, RelevantContext, RerankCandidate, RetrievalStatus, content_digest,
};
use crate::vector_store::VectorStore;

/// Finds prior conversations relevant to a new query.
pub struct ContextAssembler {
    store: Arc<VectorStore>,
    /// `None` when reranking is disabled.
    reranker: Option<ConversationReranker>,
    config: RetrievalConfig,
}

impl ContextAssembler {
    pub fn new(
        store: Arc<VectorStore>,
        reranker: Option<ConversationReranker>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            reranker,
            config,
        }
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn reranker(&self) -> Option<&ConversationReranker> {
        self.reranker.as_ref()
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Ranked prior conversations of `user_id` relevant to `query`.
    ///
    /// `top_k` defaults to the configured value. `conversation_context` holds
    /// the active conversation's turns for context-aware reranking.
    pub async fn get_relevant_context(
        &self,
        user_id: i64,
        query: &str,
        exclude_conversation_id: Option<&str>,
        top_k: Option<usize>,
        conversation_context: &[ConversationTurn],
    ) -> RelevantContext {
        let started = Instant::now();
        let result = self
            .assemble(
                user_id,
                query,
                exclude_conversation_id,
                top_k.unwrap_or(self.config.top_k),
                conversation_context,
            )
            .await;
        metrics::record_retrieval_duration(started.elapsed().as_secs_f64());
        debug!(
            user_id,
            entries = result.entries.len(),
            status = ?result.status,
            "relevant context assembled"
        );
        result
    }

    async fn assemble(
        &self,
        user_id: i64,
        query: &str,
        exclude_conversation_id: Option<&str>,
        top_k: usize,
        conversation_context: &[ConversationTurn],
    ) -> RelevantContext {
        let candidates = match self
            .store
            .load_candidates(user_id, exclude_conversation_id)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(user_id, error = %e, "failed to load retrieval candidates");
                return RelevantContext::degraded(e.to_string());
            }
        };
        if candidates.is_empty() {
            return RelevantContext::empty();
        }

        let fetch = top_k.saturating_mul(self.config.overfetch_factor.max(1));
        let similar = self.store.similarity_search(query, &candidates, fetch).await;
        if similar.is_empty() {
            return RelevantContext::empty();
        }
        let ranked: Vec<RerankCandidate> = similar.into_iter().map(to_candidate).collect();

        let (selected, mode) = match &self.reranker {
            Some(reranker) => {
                let outcome = if conversation_context.is_empty() {
                    reranker.rerank(query, ranked, top_k).await
                } else {
                    reranker
                        .rerank_with_context(query, ranked, conversation_context, top_k)
                        .await
                };
                let floor = outcome.mode.is_fallback() || self.config.enforce_floor_when_reranked;
                let selected = if floor {
                    self.apply_floor(outcome.candidates)
                } else {
                    outcome.candidates
                };
                (selected, Some(outcome.mode))
            }
            None => (self.apply_floor(similarity_order(ranked, top_k)), None),
        };

        RelevantContext {
            entries: selected.into_iter().map(ContextEntry::from).collect(),
            status: RetrievalStatus::Ranked { mode },
        }
    }

    fn apply_floor(&self, candidates: Vec<RerankCandidate>) -> Vec<RerankCandidate> {
        candidates
            .into_iter()
            .filter(|c| c.similarity > self.config.similarity_threshold)
            .collect()
    }
}

fn to_candidate((record, similarity): (ConversationVectorRecord, f32)) -> RerankCandidate {
    RerankCandidate {
        content_digest: content_digest(&record.key_entities, &record.topics),
        conversation_id: record.conversation_id,
        similarity,
        relevance_score: similarity,
        key_entities: record.key_entities,
        topics: record.topics,
        user_id: record.user_id,
        created_at: record.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RerankMode;
    use mnemo_config::model::{EmbeddingConfig, RerankerConfig};
    use mnemo_test_utils::{FailingRerankAdapter, FailingStorage, ScriptedEmbedder, TestHarness};

    use crate::embedding::EmbeddingProvider;
    use crate::extractor::KeywordExtractor;

    async fn provider() -> Arc<EmbeddingProvider> {
        let embedder = ScriptedEmbedder::new(2)
            .with_vector("query", vec![1.0, 0.0])
            .with_vector("close", vec![0.9, 0.2])
            .with_vector("weak", vec![0.2, 0.98])
            .with_vector("orthogonal", vec![0.0, 1.0]);
        let config = EmbeddingConfig {
            embedding_dim: Some(2),
            ..EmbeddingConfig::default()
        };
        Arc::new(EmbeddingProvider::with_dense(&config, Arc::new(embedder)).await)
    }

    async fn seeded_store(harness: &TestHarness) -> Arc<VectorStore> {
        let store = Arc::new(VectorStore::new(
            harness.storage(),
            provider().await,
            Arc::new(KeywordExtractor::default()),
        ));
        for (id, summary, topics) in [
            ("close", "close", vec!["general".to_string()]),
            ("weak", "weak", vec!["query".to_string()]),
            ("orthogonal", "orthogonal", vec![]),
        ] {
            harness.create_conversation(id, 1).await.unwrap();
            store
                .store_conversation_summary(id, 1, summary, &[], &topics)
                .await;
        }
        store
    }

    #[tokio::test]
    async fn user_without_vectors_gets_empty_context() {
        let harness = TestHarness::new().await.unwrap();
        let store = seeded_store(&harness).await;
        let assembler = ContextAssembler::new(
            store,
            Some(ConversationReranker::heuristic(&RerankerConfig::default())),
            RetrievalConfig::default(),
        );
        let context = assembler
            .get_relevant_context(42, "query", None, None, &[])
            .await;
        assert!(context.entries.is_empty());
        assert_eq!(context.status, RetrievalStatus::Empty);
    }

    #[tokio::test]
    async fn load_failure_is_degraded() {
        let store = Arc::new(VectorStore::new(
            Arc::new(FailingStorage),
            provider().await,
            Arc::new(KeywordExtractor::default()),
        ));
        let assembler = ContextAssembler::new(store, None, RetrievalConfig::default());
        let context = assembler.get_relevant_context(1, "query", None, None, &[]).await;
        assert!(context.entries.is_empty());
        assert!(matches!(context.status, RetrievalStatus::Degraded { .. }));
    }

    #[tokio::test]
    async fn without_reranker_applies_similarity_floor() {
        let harness = TestHarness::new().await.unwrap();
        let assembler =
            ContextAssembler::new(seeded_store(&harness).await, None, RetrievalConfig::default());
        let context = assembler.get_relevant_context(1, "query", None, None, &[]).await;

        let ids: Vec<&str> = context.entries.iter().map(|e| e.conversation_id.as_str()).collect();
        assert_eq!(ids, vec!["close"]);
        assert_eq!(context.entries[0].relevance_score, context.entries[0].similarity);
        assert_eq!(context.status.rerank_mode(), None);
    }

    #[tokio::test]
    async fn similarity_equal_to_threshold_is_dropped() {
        let harness = TestHarness::new().await.unwrap();
        let store = seeded_store(&harness).await;
        harness.create_conversation("exact", 1).await.unwrap();
        // Same text as the query, so cosine is exactly 1.0.
        store
            .store_conversation_summary("exact", 1, "query", &[], &[])
            .await;

        let config = RetrievalConfig {
            similarity_threshold: 1.0,
            ..RetrievalConfig::default()
        };
        let assembler = ContextAssembler::new(store, None, config);
        let context = assembler.get_relevant_context(1, "query", None, None, &[]).await;
        assert!(context.entries.is_empty(), "got {:?}", context.entries);
        assert_eq!(context.status, RetrievalStatus::Ranked { mode: None });
    }

    #[tokio::test]
    async fn excluded_conversation_is_never_returned() {
        let harness = TestHarness::new().await.unwrap();
        let assembler =
            ContextAssembler::new(seeded_store(&harness).await, None, RetrievalConfig::default());
        let context = assembler
            .get_relevant_context(1, "query", Some("close"), None, &[])
            .await;
        assert!(context.entries.iter().all(|e| e.conversation_id != "close"));
    }

    #[tokio::test]
    async fn reranked_results_skip_floor_by_default() {
        let harness = TestHarness::new().await.unwrap();
        let assembler = ContextAssembler::new(
            seeded_store(&harness).await,
            Some(ConversationReranker::heuristic(&RerankerConfig::default())),
            RetrievalConfig::default(),
        );
        let context = assembler.get_relevant_context(1, "query", None, None, &[]).await;
        assert_eq!(context.entries.len(), 3);
        assert!(context.entries.iter().any(|e| e.similarity < 0.3));
        assert_eq!(context.status.rerank_mode(), Some(&RerankMode::Heuristic));
    }

    #[tokio::test]
    async fn enforce_floor_filters_reranked_results() {
        let harness = TestHarness::new().await.unwrap();
        let config = RetrievalConfig {
            enforce_floor_when_reranked: true,
            ..RetrievalConfig::default()
        };
        let assembler = ContextAssembler::new(
            seeded_store(&harness).await,
            Some(ConversationReranker::heuristic(&RerankerConfig::default())),
            config,
        );
        let context = assembler.get_relevant_context(1, "query", None, None, &[]).await;
        assert!(context.entries.iter().all(|e| e.similarity > 0.3));
    }

    #[tokio::test]
    async fn failed_reranker_uses_similarity_policy() {
        let harness = TestHarness::new().await.unwrap();
        let reranker = ConversationReranker::with_cross_encoder(
            &RerankerConfig::default(),
            Arc::new(FailingRerankAdapter),
        );
        let assembler = ContextAssembler::new(
            seeded_store(&harness).await,
            Some(reranker),
            RetrievalConfig::default(),
        );
        let context = assembler.get_relevant_context(1, "query", None, None, &[]).await;
        let ids: Vec<&str> = context.entries.iter().map(|e| e.conversation_id.as_str()).collect();
        assert_eq!(ids, vec!["close"]);
        assert!(context.status.rerank_mode().is_some_and(RerankMode::is_fallback));
    }

    #[tokio::test]
    async fn top_k_override_limits_entries() {
        let harness = TestHarness::new().await.unwrap();
        let assembler = ContextAssembler::new(
            seeded_store(&harness).await,
            Some(ConversationReranker::heuristic(&RerankerConfig::default())),
            RetrievalConfig::default(),
        );
        let context = assembler
            .get_relevant_context(1, "query", None, Some(1), &[])
            .await;
        assert_eq!(context.entries.len(), 1);
    }
}
