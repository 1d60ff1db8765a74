// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding adapter for deterministic testing.
//!
//! `ScriptedEmbedder` implements `EmbeddingAdapter` with a text-to-vector
//! table. Unscripted texts embed to the unit vector on the last axis, which
//! keeps the construction probe returning the configured dimension.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use mnemo_core::traits::adapter::PluginAdapter;
use mnemo_core::traits::embedding::EmbeddingAdapter;
use mnemo_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use mnemo_core::MnemoError;

/// An embedding adapter that returns pre-configured vectors.
pub struct ScriptedEmbedder {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    failing: HashSet<String>,
    always_fail: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedEmbedder {
    /// Create an embedder producing `dimensions`-wide vectors.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
            failing: HashSet::new(),
            always_fail: false,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Return `vector` for `text`. The vector is not checked against the
    /// configured dimension.
    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Fail any batch that contains `text`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Fail every call, including the construction probe.
    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Number of `embed` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text received, in call order.
    pub fn seen_texts(&self) -> Vec<String> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.vectors.get(text).cloned().unwrap_or_else(|| {
            let mut v = vec![0.0; self.dimensions];
            if let Some(last) = v.last_mut() {
                *last = 1.0;
            }
            v
        })
    }
}

#[async_trait]
impl PluginAdapter for ScriptedEmbedder {
    fn name(&self) -> &str {
        "scripted-embedder"
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
impl EmbeddingAdapter for ScriptedEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.extend(input.texts.iter().cloned());
        }

        if self.always_fail {
            return Err(MnemoError::Encode("scripted embedder always fails".into()));
        }
        if let Some(bad) = input.texts.iter().find(|t| self.failing.contains(*t)) {
            return Err(MnemoError::Encode(format!("scripted failure on {bad:?}")));
        }

        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector_for(t)).collect(),
            dimensions: self.dimensions,
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(texts: &[&str]) -> EmbeddingInput {
        EmbeddingInput {
            texts: texts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn unscripted_text_is_last_axis_unit_vector() {
        let embedder = ScriptedEmbedder::new(3).with_vector("a", vec![1.0, 0.0, 0.0]);
        let out = embedder.embed(input(&["a", "b"])).await.unwrap();
        assert_eq!(out.embeddings, vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]]);
        assert_eq!(out.dimensions, 3);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn failing_text_fails_whole_batch() {
        let embedder = ScriptedEmbedder::new(2).failing_on("bad");
        assert!(embedder.embed(input(&["ok", "bad"])).await.is_err());
        assert!(embedder.embed(input(&["ok"])).await.is_ok());
        assert_eq!(embedder.seen_texts(), vec!["ok", "bad", "ok"]);
    }

    #[tokio::test]
    async fn always_failing_rejects_probe() {
        let embedder = ScriptedEmbedder::new(2).always_failing();
        assert!(embedder.embed(input(&["test"])).await.is_err());
    }
}
