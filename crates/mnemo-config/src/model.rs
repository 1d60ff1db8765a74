// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mnemo memory subsystem.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Mnemo configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// Process-level settings (logging, data directory).
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Conversation-memory reranker settings.
    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Context assembly policy.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Web-search result reranker settings.
    #[serde(default)]
    pub websearch: WebSearchConfig,
}

/// Every section of `mnemo.toml` with the keys it accepts.
pub const SECTION_KEYS: &[(&str, &[&str])] = &[
    ("runtime", &["log_level", "data_dir"]),
    ("storage", &["database_path", "wal_mode"]),
    (
        "embedding",
        &[
            "backend",
            "model_name",
            "embedding_dim",
            "device",
            "max_seq_length",
            "normalize",
            "batch_size",
            "cache_enabled",
            "cache_size",
            "auto_download",
            "intra_threads",
        ],
    ),
    (
        "reranker",
        &[
            "enabled",
            "strategy",
            "model_name",
            "similarity_weight",
            "keyword_weight",
            "entity_bonus",
            "topic_bonus",
            "context_turns",
            "context_chars",
        ],
    ),
    (
        "retrieval",
        &[
            "top_k",
            "similarity_threshold",
            "overfetch_factor",
            "enforce_floor_when_reranked",
        ],
    ),
    (
        "websearch",
        &[
            "use_reranker",
            "strategy",
            "rerank_top_k",
            "max_content_length",
            "min_relevance_score",
            "domain_keyword_bonus",
            "domain_keywords",
            "title_weight",
            "content_weight",
            "source_weights",
        ],
    ),
];

/// Keys accepted by `section`, or `None` when no such section exists.
pub fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    SECTION_KEYS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Root directory for model files and other local state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("mnemo"))
        .unwrap_or_else(|| std::path::PathBuf::from(".mnemo"))
        .to_string_lossy()
        .into_owned()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("mnemo").join("mnemo.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("mnemo.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Which embedding backend the provider should try to use.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Dense ONNX model when its files are available, hash vectors otherwise.
    #[default]
    Auto,
    /// Dense ONNX model; a load failure is still recorded as a fallback.
    Onnx,
    /// Hash vectors only, no model files consulted.
    Hash,
}

/// Execution device for ONNX sessions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Device {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Model identifier; also part of every cache key.
    #[serde(default = "default_embedding_model")]
    pub model_name: String,

    /// Explicit output dimension. When unset, the known-model table decides.
    #[serde(default)]
    pub embedding_dim: Option<usize>,

    #[serde(default)]
    pub device: Device,

    /// Maximum tokens per input; longer inputs are truncated.
    #[serde(default = "default_max_seq_length")]
    pub max_seq_length: usize,

    /// L2-normalize dense vectors.
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Texts per dense inference call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Download known models from HuggingFace when missing.
    #[serde(default)]
    pub auto_download: bool,

    /// ONNX intra-op thread count.
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model_name: default_embedding_model(),
            embedding_dim: None,
            device: Device::default(),
            max_seq_length: default_max_seq_length(),
            normalize: true,
            batch_size: default_batch_size(),
            cache_enabled: true,
            cache_size: default_cache_size(),
            auto_download: false,
            intra_threads: default_intra_threads(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_max_seq_length() -> usize {
    512
}

fn default_batch_size() -> usize {
    32
}

fn default_cache_size() -> usize {
    10_000
}

fn default_intra_threads() -> usize {
    1
}

/// Reranking strategy requested by configuration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RerankStrategyKind {
    /// Weighted similarity plus lexical/entity/topic overlap.
    #[default]
    Heuristic,
    /// ONNX cross-encoder; falls back to heuristic when it cannot be loaded.
    CrossEncoder,
    /// Cross-encoder if its model files are already present, heuristic otherwise.
    Auto,
}

/// Conversation-memory reranker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RerankerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: RerankStrategyKind,

    /// Cross-encoder model identifier.
    #[serde(default = "default_reranker_model")]
    pub model_name: String,

    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f32,

    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Weight of query words matched in key entities.
    #[serde(default = "default_entity_bonus")]
    pub entity_bonus: f32,

    /// Weight of query words matched in topics.
    #[serde(default = "default_topic_bonus")]
    pub topic_bonus: f32,

    /// Turns of the active conversation used by context-aware reranking.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Characters kept from each turn in the context summary.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: RerankStrategyKind::default(),
            model_name: default_reranker_model(),
            similarity_weight: default_similarity_weight(),
            keyword_weight: default_keyword_weight(),
            entity_bonus: default_entity_bonus(),
            topic_bonus: default_topic_bonus(),
            context_turns: default_context_turns(),
            context_chars: default_context_chars(),
        }
    }
}

fn default_reranker_model() -> String {
    "bge-reranker-base".to_string()
}

fn default_similarity_weight() -> f32 {
    0.7
}

fn default_keyword_weight() -> f32 {
    0.3
}

fn default_entity_bonus() -> f32 {
    0.5
}

fn default_topic_bonus() -> f32 {
    0.3
}

fn default_context_turns() -> usize {
    3
}

fn default_context_chars() -> usize {
    100
}

/// Context assembly policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Raw similarity an entry must exceed to be kept when results are not reranked.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Candidates fetched per requested result before reranking.
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    /// Apply `similarity_threshold` to reranked results as well.
    #[serde(default)]
    pub enforce_floor_when_reranked: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            overfetch_factor: default_overfetch_factor(),
            enforce_floor_when_reranked: false,
        }
    }
}

fn default_top_k() -> usize {
    3
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_overfetch_factor() -> usize {
    2
}

/// Web-search result reranker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub use_reranker: bool,

    #[serde(default)]
    pub strategy: RerankStrategyKind,

    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,

    /// Characters of hit content kept for scoring and output.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f32,

    /// Added once per domain keyword appearing in a hit.
    #[serde(default = "default_domain_keyword_bonus")]
    pub domain_keyword_bonus: f32,

    #[serde(default)]
    pub domain_keywords: Vec<String>,

    #[serde(default = "default_title_weight")]
    pub title_weight: f32,

    #[serde(default = "default_content_weight")]
    pub content_weight: f32,

    /// Multiplier per hit source label; unlisted sources weigh 1.0.
    #[serde(default = "default_source_weights")]
    pub source_weights: BTreeMap<String, f32>,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            use_reranker: true,
            strategy: RerankStrategyKind::default(),
            rerank_top_k: default_rerank_top_k(),
            max_content_length: default_max_content_length(),
            min_relevance_score: default_min_relevance_score(),
            domain_keyword_bonus: default_domain_keyword_bonus(),
            domain_keywords: Vec::new(),
            title_weight: default_title_weight(),
            content_weight: default_content_weight(),
            source_weights: default_source_weights(),
        }
    }
}

fn default_rerank_top_k() -> usize {
    5
}

fn default_max_content_length() -> usize {
    500
}

fn default_min_relevance_score() -> f32 {
    0.1
}

fn default_domain_keyword_bonus() -> f32 {
    0.1
}

fn default_title_weight() -> f32 {
    0.7
}

fn default_content_weight() -> f32 {
    0.3
}

fn default_source_weights() -> BTreeMap<String, f32> {
    BTreeMap::from([
        ("wikipedia".to_string(), 0.8),
        ("web".to_string(), 0.6),
    ])
}
