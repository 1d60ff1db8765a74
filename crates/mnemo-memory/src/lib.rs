// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational memory retrieval for the Mnemo workspace.
//!
//! Given a user's new query, finds prior conversations most relevant to it
//! and returns them ranked for prompt injection.
//!
//! ## Architecture
//!
//! - **EmbeddingProvider**: dense ONNX backend or hash fallback, FIFO cache
//! - **OnnxEmbedder** / **HashEmbedder**: the two `EmbeddingAdapter` backends
//! - **ModelManager**: model file resolution and first-use download
//! - **VectorStore**: message and conversation vectors, brute-force search
//! - **ConversationReranker** / **WebSearchReranker**: heuristic or cross-encoder
//! - **ContextAssembler**: `get_relevant_context` orchestration
//! - **KeywordExtractor**: default summary/topic/entity extraction
//! - **MemorySearchTool** / **ContextEnhancementTool**: agent tools

pub mod assembler;
pub mod cache;
pub mod cross_encoder;
pub mod embedder;
pub mod embedding;
pub mod extractor;
pub mod hash_embedder;
pub mod metrics;
pub mod model_manager;
pub mod reranker;
pub mod tool;
pub mod types;
pub mod vector_store;
pub mod web_reranker;

pub use assembler::ContextAssembler;
pub use cache::EmbeddingCache;
pub use cross_encoder::OnnxCrossEncoder;
pub use embedder::{OnnxEmbedder, OnnxOptions};
pub use embedding::{EmbeddingProvider, EncodedText};
pub use extractor::{KeywordExtractor, KeywordExtractorOptions};
pub use hash_embedder::{HASH_MODEL_NAME, HashEmbedder};
pub use model_manager::ModelManager;
pub use reranker::{ConversationReranker, RerankStrategy};
pub use tool::{ContextEnhancementTool, MemorySearchTool, Tool, ToolOutput};
pub use types::*;
pub use vector_store::VectorStore;
pub use web_reranker::{ScoredHit, WebRerankOutcome, WebSearchReranker};
