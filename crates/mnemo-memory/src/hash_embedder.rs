// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic hash-derived embeddings.
//!
//! Each SHA-256 digest byte becomes one component `byte / 255`, and the
//! vector is zero-padded or truncated to the target dimension. These vectors
//! carry no semantics; they keep the pipeline available without a model.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use mnemo_core::error::MnemoError;
use mnemo_core::traits::EmbeddingAdapter;
use mnemo_core::traits::adapter::PluginAdapter;
use mnemo_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

/// Model name recorded for hash-derived vectors.
pub const HASH_MODEL_NAME: &str = "hash-sha256";

/// Compute the hash embedding of `text` with `dimensions` components.
pub fn hash_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let mut vector: Vec<f32> = digest
        .iter()
        .take(dimensions)
        .map(|&b| f32::from(b) / 255.0)
        .collect();
    vector.resize(dimensions, 0.0);
    vector
}

/// Embedding adapter backed by [`hash_embedding`].
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        hash_embedding(text, self.dimensions)
    }
}

#[async_trait]
impl PluginAdapter for HashEmbedder {
    fn name(&self) -> &str {
        "hash-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HashEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.embed_text(t)).collect(),
            dimensions: self.dimensions,
        })
    }

    fn model_name(&self) -> &str {
        HASH_MODEL_NAME
    }
}
