// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemo memory subsystem.

use thiserror::Error;

/// The primary error type used across all Mnemo adapter traits and core operations.
///
/// Retrieval entry points never surface these to their callers directly; they
/// are folded into typed degraded outcomes. Internal layers propagate them with `?`.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Configuration errors (invalid TOML, out-of-range weights, missing paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An embedding or rerank model is missing or failed to initialize.
    #[error("model unavailable: {model}: {reason}")]
    ModelUnavailable { model: String, reason: String },

    /// Encoding a specific input failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// A reranking strategy failed while scoring candidates.
    #[error("rerank failed: {0}")]
    Rerank(String),

    /// The entity/topic extraction collaborator failed.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Requested adapter was not found.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemoError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MnemoError::Storage {
            source: Box::new(err),
        }
    }
}
