// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reranker for web search hits.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use mnemo_config::model::{EmbeddingConfig, WebSearchConfig};
use mnemo_core::error::MnemoError;
use mnemo_core::traits::RerankAdapter;

use crate::metrics;
use crate::reranker::{RerankStrategy, load_cross_encoder, unit, words};
use crate::types::{RerankMode, WebSearchHit};

/// A hit with its final relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub hit: WebSearchHit,
    pub relevance_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebRerankOutcome {
    pub hits: Vec<ScoredHit>,
    pub mode: RerankMode,
}

#[derive(Debug, Clone)]
pub struct WebSearchReranker {
    config: WebSearchConfig,
    strategy: RerankStrategy,
    construction_failure: Option<String>,
}

impl WebSearchReranker {
    pub fn heuristic(config: WebSearchConfig) -> Self {
        Self {
            config,
            strategy: RerankStrategy::Heuristic,
            construction_failure: None,
        }
    }

    pub fn with_cross_encoder(config: WebSearchConfig, adapter: Arc<dyn RerankAdapter>) -> Self {
        Self {
            config,
            strategy: RerankStrategy::CrossEncoder(adapter),
            construction_failure: None,
        }
    }

    /// Build from configuration; `model_name` names the cross-encoder to load.
    pub async fn from_config(
        config: WebSearchConfig,
        model_name: &str,
        embedding: &EmbeddingConfig,
        data_dir: &Path,
    ) -> Self {
        match load_cross_encoder(config.strategy, model_name, embedding, data_dir).await {
            Ok(Some(adapter)) => Self::with_cross_encoder(config, adapter),
            Ok(None) => Self::heuristic(config),
            Err(e) => {
                warn!(model = model_name, error = %e, "web cross-encoder unavailable, using heuristic");
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

    /// Score, filter and cut `hits` for `query`.
    pub async fn rerank(&self, query: &str, hits: Vec<WebSearchHit>) -> WebRerankOutcome {
        let hits: Vec<WebSearchHit> = hits
            .into_iter()
            .map(|mut hit| {
                hit.content = truncate_chars(&hit.content, self.config.max_content_length);
                hit
            })
            .collect();

        if !self.config.use_reranker {
            return WebRerankOutcome {
                hits: self.upstream_order(hits),
                mode: RerankMode::Fallback {
                    reason: "web reranking disabled".to_string(),
                },
            };
        }

        let scored = match &self.strategy {
            RerankStrategy::Heuristic => {
                let scores = hits.iter().map(|h| self.heuristic_score(query, h)).collect();
                Ok((scores, RerankMode::Heuristic))
            }
            RerankStrategy::CrossEncoder(adapter) => self
                .cross_encode(adapter.as_ref(), query, &hits)
                .await
                .map(|scores| (scores, RerankMode::CrossEncoder)),
        };

        match scored {
            Ok((scores, mode)) => {
                let mut ranked: Vec<ScoredHit> = hits
                    .into_iter()
                    .zip(scores)
                    .map(|(hit, relevance_score)| ScoredHit {
                        hit,
                        relevance_score,
                    })
                    .filter(|s| s.relevance_score >= self.config.min_relevance_score)
                    .collect();
                ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
                ranked.truncate(self.config.rerank_top_k);
                WebRerankOutcome { hits: ranked, mode }
            }
            Err(e) => {
                warn!(error = %e, "web reranking failed, keeping upstream order");
                metrics::record_rerank_fallback("websearch");
                WebRerankOutcome {
                    hits: self.upstream_order(hits),
                    mode: RerankMode::Fallback {
                        reason: e.to_string(),
                    },
                }
            }
        }
    }

    /// Heuristic relevance of a (truncated) hit, in `[0, 1]`.
    pub fn heuristic_score(&self, query: &str, hit: &WebSearchHit) -> f32 {
        let query_words = words(query);
        let denominator = query_words.len().max(1) as f32;
        let title_overlap = query_words.intersection(&words(&hit.title)).count() as f32 / denominator;
        let content_overlap =
            query_words.intersection(&words(&hit.content)).count() as f32 / denominator;

        let base = self.config.title_weight * title_overlap
            + self.config.content_weight * content_overlap;
        let weighted = base * self.source_weight(&hit.source);

        let title = hit.title.to_lowercase();
        let content = hit.content.to_lowercase();
        let keyword_hits = self
            .config
            .domain_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| !k.is_empty() && (title.contains(k.as_str()) || content.contains(k.as_str())))
            .count() as f32;

        unit(weighted + self.config.domain_keyword_bonus * keyword_hits)
    }

    fn source_weight(&self, source: &str) -> f32 {
        self.config
            .source_weights
            .get(source)
            .copied()
            .unwrap_or(1.0)
    }

    async fn cross_encode(
        &self,
        adapter: &dyn RerankAdapter,
        query: &str,
        hits: &[WebSearchHit],
    ) -> Result<Vec<f32>, MnemoError> {
        let documents: Vec<String> = hits
            .iter()
            .map(|h| format!("{}\n{}", h.title, h.content))
            .collect();
        let scores = adapter.score_pairs(query, &documents).await?;
        if scores.len() != hits.len() {
            return Err(MnemoError::Rerank(format!(
                "{} scores for {} hits",
                scores.len(),
                hits.len()
            )));
        }
        Ok(scores.into_iter().map(unit).collect())
    }

    fn upstream_order(&self, hits: Vec<WebSearchHit>) -> Vec<ScoredHit> {
        hits.into_iter()
            .take(self.config.rerank_top_k)
            .map(|hit| ScoredHit {
                relevance_score: unit(hit.score),
                hit,
            })
            .collect()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_test_utils::FailingRerankAdapter;

    fn hit(title: &str, content: &str, source: &str, score: f32) -> WebSearchHit {
        WebSearchHit {
            title: title.to_string(),
            content: content.to_string(),
            url: format!("https://example.org/{}", title.replace(' ', "_")),
            source: source.to_string(),
            score,
        }
    }

    #[test]
    fn heuristic_weights_title_content_and_source() {
        let reranker = WebSearchReranker::heuristic(WebSearchConfig::default());
        // title overlap 2/2, content overlap 1/2: (0.7 + 0.15) * 0.8
        let h = hit("Ziegler catalysis", "history of catalysis", "wikipedia", 0.0);
        let score = reranker.heuristic_score("ziegler catalysis", &h);
        assert!((score - 0.68).abs() < 1e-6, "got {score}");
    }

    #[test]
    fn unlisted_source_weighs_one() {
        let reranker = WebSearchReranker::heuristic(WebSearchConfig::default());
        let h = hit("catalysis", "", "forum", 0.0);
        let score = reranker.heuristic_score("catalysis", &h);
        assert!((score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn domain_keywords_add_bonus_per_keyword() {
        let config = WebSearchConfig {
            domain_keywords: vec!["Polymer".to_string(), "monomer".to_string(), "absent".to_string()],
            ..WebSearchConfig::default()
        };
        let reranker = WebSearchReranker::heuristic(config);
        let h = hit("polymer basics", "a monomer joins", "forum", 0.0);
        let score = reranker.heuristic_score("unrelated", &h);
        assert!((score - 0.2).abs() < 1e-6, "got {score}");
    }

    #[tokio::test]
    async fn low_relevance_hits_are_dropped_and_cut() {
        let config = WebSearchConfig {
            rerank_top_k: 1,
            ..WebSearchConfig::default()
        };
        let reranker = WebSearchReranker::heuristic(config);
        let outcome = reranker
            .rerank(
                "zeolite pores",
                vec![
                    hit("cooking", "recipes", "web", 0.9),
                    hit("zeolite", "pores in zeolite", "web", 0.1),
                    hit("zeolite pores", "pores", "wikipedia", 0.1),
                ],
            )
            .await;
        assert_eq!(outcome.mode, RerankMode::Heuristic);
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.hits[0].hit.title, "zeolite pores");
    }

    #[tokio::test]
    async fn content_is_truncated() {
        let config = WebSearchConfig {
            max_content_length: 5,
            min_relevance_score: 0.0,
            ..WebSearchConfig::default()
        };
        let reranker = WebSearchReranker::heuristic(config);
        let outcome = reranker
            .rerank("q", vec![hit("t", "héllo world", "web", 0.5)])
            .await;
        assert_eq!(outcome.hits[0].hit.content, "héllo");
    }

    #[tokio::test]
    async fn failure_keeps_upstream_order_and_scores() {
        let reranker =
            WebSearchReranker::with_cross_encoder(WebSearchConfig::default(), Arc::new(FailingRerankAdapter));
        let outcome = reranker
            .rerank(
                "q",
                vec![hit("b", "", "web", 0.4), hit("a", "", "web", 0.9)],
            )
            .await;
        assert!(outcome.mode.is_fallback());
        assert_eq!(outcome.hits[0].hit.title, "b");
        assert_eq!(outcome.hits[0].relevance_score, 0.4);
        assert_eq!(outcome.hits[1].relevance_score, 0.9);
    }

    #[tokio::test]
    async fn disabled_reranker_passes_hits_through() {
        let config = WebSearchConfig {
            use_reranker: false,
            rerank_top_k: 2,
            ..WebSearchConfig::default()
        };
        let reranker = WebSearchReranker::heuristic(config);
        let outcome = reranker
            .rerank(
                "q",
                vec![hit("a", "", "web", 0.1), hit("b", "", "web", 0.2), hit("c", "", "web", 0.3)],
            )
            .await;
        let titles: Vec<&str> = outcome.hits.iter().map(|h| h.hit.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }
}
