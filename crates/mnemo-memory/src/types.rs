// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval domain types and typed outcomes.

use serde::{Deserialize, Serialize};

/// Which embedding backend a provider settled on at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendState {
    /// A dense model is loaded and used for every text.
    Dense { model: String },
    /// Every text is embedded with the hash fallback.
    Fallback { reason: String },
}

impl BackendState {
    pub fn is_dense(&self) -> bool {
        matches!(self, BackendState::Dense { .. })
    }
}

/// Snapshot of an embedding provider's configuration and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingInfo {
    pub model_name: String,
    pub dimensions: usize,
    /// Resolved device, e.g. `cpu`.
    pub device: String,
    pub dense_active: bool,
    pub cache_enabled: bool,
    pub cache_len: usize,
    /// Texts embedded with the hash fallback since construction.
    pub fallback_count: u64,
}

/// Result of a best-effort vector write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOutcome {
    Persisted { vector_id: String },
    Unpersisted { reason: String },
}

impl WriteOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, WriteOutcome::Persisted { .. })
    }
}

/// Summary of recomputing one conversation's vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub conversation_id: String,
    /// Messages in the conversation history.
    pub messages: usize,
    /// Messages that received a new embedding.
    pub backfilled: usize,
    /// Messages whose embedding could not be written.
    pub backfill_failures: usize,
    pub summary: WriteOutcome,
}

/// A similarity-ranked conversation awaiting reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankCandidate {
    pub conversation_id: String,
    /// Raw cosine similarity to the query.
    pub similarity: f32,
    /// Final relevance in `[0, 1]`; equals `similarity` until reranked.
    pub relevance_score: f32,
    pub key_entities: Vec<String>,
    pub topics: Vec<String>,
    pub content_digest: String,
    pub user_id: i64,
    pub created_at: String,
}

/// How a rerank call produced its ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RerankMode {
    Heuristic,
    CrossEncoder,
    /// Upstream order kept because reranking failed.
    Fallback { reason: String },
}

impl RerankMode {
    pub fn is_fallback(&self) -> bool {
        matches!(self, RerankMode::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankOutcome {
    pub candidates: Vec<RerankCandidate>,
    pub mode: RerankMode,
}

/// One retrieved conversation, ready for prompt injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub conversation_id: String,
    pub similarity: f32,
    pub relevance_score: f32,
    pub topics: Vec<String>,
    pub entities: Vec<String>,
    pub content_digest: String,
}

impl From<RerankCandidate> for ContextEntry {
    fn from(c: RerankCandidate) -> Self {
        Self {
            conversation_id: c.conversation_id,
            similarity: c.similarity,
            relevance_score: c.relevance_score,
            topics: c.topics,
            entities: c.key_entities,
            content_digest: c.content_digest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalStatus {
    /// Entries were ranked, by the reranker or by raw similarity.
    Ranked { mode: Option<RerankMode> },
    /// The user has no candidate conversations.
    Empty,
    /// Candidates could not be loaded or searched.
    Degraded { reason: String },
}

impl RetrievalStatus {
    /// Reranking mode of a ranked result, if a reranker ran.
    pub fn rerank_mode(&self) -> Option<&RerankMode> {
        match self {
            RetrievalStatus::Ranked { mode } => mode.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantContext {
    pub entries: Vec<ContextEntry>,
    pub status: RetrievalStatus,
}

impl RelevantContext {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            status: RetrievalStatus::Empty,
        }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            status: RetrievalStatus::Degraded {
                reason: reason.into(),
            },
        }
    }
}

/// A web search result handed to the web reranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchHit {
    pub title: String,
    pub content: String,
    pub url: String,
    /// Result origin such as `wikipedia` or `web`.
    pub source: String,
    /// Upstream search score.
    pub score: f32,
}

/// Vector store counters plus the active embedding backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreStats {
    pub conversations: u64,
    pub conversation_vectors: u64,
    pub messages: u64,
    pub embedded_messages: u64,
    pub model_name: String,
    pub dimensions: usize,
    pub dense_active: bool,
}

/// Text stand-in for a conversation: `"Key entities: a, b | Topics: x, y"`.
pub fn content_digest(entities: &[String], topics: &[String]) -> String {
    let mut parts = Vec::with_capacity(2);
    if !entities.is_empty() {
        parts.push(format!("Key entities: {}", entities.join(", ")));
    }
    if !topics.is_empty() {
        parts.push(format!("Topics: {}", topics.join(", ")));
    }
    if parts.is_empty() {
        "Conversation record".to_string()
    } else {
        parts.join(" | ")
    }
}
