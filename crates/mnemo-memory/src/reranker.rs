// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation-memory reranker.
//!
//! Re-scores similarity-ranked candidates either with a cross-encoder or with
//! a weighted blend of similarity and lexical, entity and topic overlap. Any
//! failure keeps the upstream similarity order.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use mnemo_config::model::{EmbeddingConfig, RerankStrategyKind, RerankerConfig};
use mnemo_core::error::MnemoError;
use mnemo_core::traits::RerankAdapter;
use mnemo_core::types::ConversationTurn;

use crate::cross_encoder::OnnxCrossEncoder;
use crate::metrics;
use crate::model_manager::ModelManager;
use crate::types::{RerankCandidate, RerankMode, RerankOutcome};

/// Scoring strategy, fixed at construction.
#[derive(Clone)]
pub enum RerankStrategy {
    Heuristic,
    CrossEncoder(Arc<dyn RerankAdapter>),
}

impl std::fmt::Debug for RerankStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RerankStrategy::Heuristic => f.write_str("Heuristic"),
            RerankStrategy::CrossEncoder(adapter) => {
                f.debug_tuple("CrossEncoder").field(&adapter.name()).finish()
            }
        }
    }
}

/// Weights of the heuristic relevance formula.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicWeights {
    pub similarity_weight: f32,
    pub keyword_weight: f32,
    pub entity_bonus: f32,
    pub topic_bonus: f32,
}

impl From<&RerankerConfig> for HeuristicWeights {
    fn from(config: &RerankerConfig) -> Self {
        Self {
            similarity_weight: config.similarity_weight,
            keyword_weight: config.keyword_weight,
            entity_bonus: config.entity_bonus,
            topic_bonus: config.topic_bonus,
        }
    }
}

/// Reranker for conversation-memory candidates.
#[derive(Debug, Clone)]
pub struct ConversationReranker {
    strategy: RerankStrategy,
    weights: HeuristicWeights,
    context_turns: usize,
    context_chars: usize,
    /// Why a configured cross-encoder is not in use.
    construction_failure: Option<String>,
}

impl ConversationReranker {
    pub fn heuristic(config: &RerankerConfig) -> Self {
        Self {
            strategy: RerankStrategy::Heuristic,
            weights: HeuristicWeights::from(config),
            context_turns: config.context_turns,
            context_chars: config.context_chars,
            construction_failure: None,
        }
    }

    pub fn with_cross_encoder(config: &RerankerConfig, adapter: Arc<dyn RerankAdapter>) -> Self {
        Self {
            strategy: RerankStrategy::CrossEncoder(adapter),
            ..Self::heuristic(config)
        }
    }

    /// Build the configured strategy, falling back to the heuristic when the
    /// cross-encoder cannot be loaded.
    pub async fn from_config(
        config: &RerankerConfig,
        embedding: &EmbeddingConfig,
        data_dir: &Path,
    ) -> Self {
        match load_cross_encoder(config.strategy, &config.model_name, embedding, data_dir).await {
            Ok(Some(adapter)) => Self::with_cross_encoder(config, adapter),
            Ok(None) => Self::heuristic(config),
            Err(e) => {
                warn!(
                    model = %config.model_name,
                    error = %e,
                    "cross-encoder unavailable, using heuristic reranking"
                );
                Self {
                    construction_failure: Some(e.to_string()),
                    ..Self::heuristic(config)
                }
            }
        }
    }

    pub fn strategy(&self) -> &RerankStrategy {
        &self.strategy
    }

    pub fn construction_failure(&self) -> Option<&str> {
        self.construction_failure.as_deref()
    }

    /// Re-score `candidates` against `query` and keep the best `top_k`.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        top_k: usize,
    ) -> RerankOutcome {
        if candidates.is_empty() {
            return RerankOutcome {
                candidates,
                mode: self.success_mode(),
            };
        }

        match &self.strategy {
            RerankStrategy::Heuristic => {
                let query_words = words(query);
                let mut scored = candidates;
                for candidate in &mut scored {
                    candidate.relevance_score =
                        heuristic_relevance(&query_words, candidate, &self.weights);
                }
                RerankOutcome {
                    candidates: sort_by_relevance(scored, top_k),
                    mode: RerankMode::Heuristic,
                }
            }
            RerankStrategy::CrossEncoder(adapter) => {
                match cross_encode(adapter.as_ref(), query, &candidates).await {
                    Ok(scores) => {
                        let mut scored = candidates;
                        for (candidate, score) in scored.iter_mut().zip(scores) {
                            candidate.relevance_score = unit(score);
                        }
                        RerankOutcome {
                            candidates: sort_by_relevance(scored, top_k),
                            mode: RerankMode::CrossEncoder,
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "reranking failed, keeping similarity order");
                        metrics::record_rerank_fallback("conversation");
                        RerankOutcome {
                            candidates: similarity_order(candidates, top_k),
                            mode: RerankMode::Fallback {
                                reason: e.to_string(),
                            },
                        }
                    }
                }
            }
        }
    }

    /// Rerank with the query prefixed by a summary of recent turns.
    pub async fn rerank_with_context(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        history: &[ConversationTurn],
        top_k: usize,
    ) -> RerankOutcome {
        let summary = context_summary(history, self.context_turns, self.context_chars);
        if summary.is_empty() {
            return self.rerank(query, candidates, top_k).await;
        }
        let enhanced = contextual_query(query, &summary);
        debug!(query = %enhanced, "reranking with conversation context");
        self.rerank(&enhanced, candidates, top_k).await
    }

    fn success_mode(&self) -> RerankMode {
        match self.strategy {
            RerankStrategy::Heuristic => RerankMode::Heuristic,
            RerankStrategy::CrossEncoder(_) => RerankMode::CrossEncoder,
        }
    }
}

async fn cross_encode(
    adapter: &dyn RerankAdapter,
    query: &str,
    candidates: &[RerankCandidate],
) -> Result<Vec<f32>, MnemoError> {
    let documents: Vec<String> = candidates.iter().map(|c| c.content_digest.clone()).collect();
    let scores = adapter.score_pairs(query, &documents).await?;
    if scores.len() != documents.len() {
        return Err(MnemoError::Rerank(format!(
            "{} scores for {} documents",
            scores.len(),
            documents.len()
        )));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(MnemoError::Rerank("non-finite relevance score".to_string()));
    }
    Ok(scores)
}

/// Resolve the cross-encoder for `strategy`.
///
/// `Heuristic` yields `None`; `Auto` loads the model only when its files are
/// already present; `CrossEncoder` downloads it if `auto_download` allows.
pub async fn load_cross_encoder(
    strategy: RerankStrategyKind,
    model_name: &str,
    embedding: &EmbeddingConfig,
    data_dir: &Path,
) -> Result<Option<Arc<dyn RerankAdapter>>, MnemoError> {
    let manager = ModelManager::new(data_dir.to_path_buf());
    let files = match strategy {
        RerankStrategyKind::Heuristic => return Ok(None),
        RerankStrategyKind::Auto if !manager.is_model_available(model_name) => return Ok(None),
        RerankStrategyKind::Auto => manager.ensure_model(model_name, false).await?,
        RerankStrategyKind::CrossEncoder => {
            manager
                .ensure_model(model_name, embedding.auto_download)
                .await?
        }
    };

    let encoder = OnnxCrossEncoder::new(
        model_name,
        &files.model_path,
        &files.tokenizer_path,
        embedding.max_seq_length,
        embedding.intra_threads,
    )?;
    let adapter: Arc<dyn RerankAdapter> = Arc::new(encoder);
    Ok(Some(adapter))
}

/// Heuristic relevance of one candidate, in `[0, 1]`.
pub fn heuristic_relevance(
    query_words: &BTreeSet<String>,
    candidate: &RerankCandidate,
    weights: &HeuristicWeights,
) -> f32 {
    // Digest labels ("Key entities", "Topics", "Conversation record") are
    // not content and never count as overlap.
    let entity_words = phrase_words(&candidate.key_entities);
    let topic_words = phrase_words(&candidate.topics);
    let content_words: BTreeSet<String> = entity_words.union(&topic_words).cloned().collect();

    let word_overlap = query_words.intersection(&content_words).count() as f32;
    let entity_overlap = query_words.intersection(&entity_words).count() as f32;
    let topic_overlap = query_words.intersection(&topic_words).count() as f32;

    let keyword_score = unit(
        (word_overlap + weights.entity_bonus * entity_overlap + weights.topic_bonus * topic_overlap)
            / query_words.len().max(1) as f32,
    );

    unit(weights.similarity_weight * candidate.similarity + weights.keyword_weight * keyword_score)
}

/// Lowercased alphanumeric tokens of `text`.
pub fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn phrase_words(phrases: &[String]) -> BTreeSet<String> {
    phrases.iter().flat_map(|p| words(p)).collect()
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
pub(crate) fn unit(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

fn sort_by_relevance(mut candidates: Vec<RerankCandidate>, top_k: usize) -> Vec<RerankCandidate> {
    candidates.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    candidates.truncate(top_k);
    candidates
}

/// Stable similarity order with `relevance_score := similarity`.
pub fn similarity_order(mut candidates: Vec<RerankCandidate>, top_k: usize) -> Vec<RerankCandidate> {
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    for candidate in &mut candidates {
        candidate.relevance_score = unit(candidate.similarity);
    }
    candidates.truncate(top_k);
    candidates
}

/// Compact summary of the last `turns` turns: `"role: first N chars..."` joined by `" | "`.
pub fn context_summary(history: &[ConversationTurn], turns: usize, chars: usize) -> String {
    let start = history.len().saturating_sub(turns);
    history[start..]
        .iter()
        .filter(|t| !t.content.is_empty())
        .map(|t| {
            let head: String = t.content.chars().take(chars).collect();
            format!("{}: {head}...", t.role)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn contextual_query(query: &str, summary: &str) -> String {
    format!("Previous conversation: {summary} | Current question: {query}")
}
