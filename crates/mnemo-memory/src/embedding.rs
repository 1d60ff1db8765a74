// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider: dense backend selection, FIFO cache, hash fallback.
//!
//! The provider never fails to produce a vector. Backend selection happens
//! once at construction and is recorded as a [`BackendState`]; afterwards a
//! text that cannot be encoded densely receives the hash embedding instead.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use mnemo_config::model::{Device, EmbeddingBackend, EmbeddingConfig};
use mnemo_core::cosine_similarity;
use mnemo_core::traits::EmbeddingAdapter;
use mnemo_core::types::EmbeddingInput;

use crate::cache::{EmbeddingCache, cache_key};
use crate::embedder::{OnnxEmbedder, OnnxOptions};
use crate::hash_embedder::{HASH_MODEL_NAME, HashEmbedder};
use crate::metrics;
use crate::model_manager::{ModelManager, known_dimension};
use crate::types::{BackendState, EmbeddingInfo};

/// Dimension used when neither configuration nor the model registry names one.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// A vector together with the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedText {
    pub vector: Vec<f32>,
    pub model: String,
}

/// Text-to-vector service shared by the vector store and the rerankers.
pub struct EmbeddingProvider {
    model_name: String,
    dimensions: usize,
    device: &'static str,
    backend: BackendState,
    dense: Option<Arc<dyn EmbeddingAdapter>>,
    hash: HashEmbedder,
    cache: Option<Mutex<EmbeddingCache>>,
    batch_size: usize,
    fallback_count: AtomicU64,
}

impl EmbeddingProvider {
    /// Build a provider from configuration, loading the ONNX model when allowed.
    ///
    /// Model problems never fail construction: the provider falls back to
    /// hash embeddings and records why.
    pub async fn from_config(config: &EmbeddingConfig, data_dir: &Path) -> Self {
        let device = resolve_device(config.device);

        if config.backend == EmbeddingBackend::Hash {
            return Self::hash_only(config, "hash backend selected by configuration");
        }

        let manager = ModelManager::new(data_dir.to_path_buf());
        let loaded = match manager
            .ensure_model(&config.model_name, config.auto_download)
            .await
        {
            Ok(files) => OnnxEmbedder::new(
                config.model_name.clone(),
                &files.model_path,
                &files.tokenizer_path,
                &OnnxOptions {
                    max_seq_length: config.max_seq_length,
                    normalize: config.normalize,
                    intra_threads: config.intra_threads,
                },
            ),
            Err(e) => Err(e),
        };

        match loaded {
            Ok(embedder) => {
                debug!(model = %config.model_name, device, "dense embedding model loaded");
                Self::with_dense(config, Arc::new(embedder)).await
            }
            Err(e) => {
                warn!(
                    model = %config.model_name,
                    error = %e,
                    "embedding model unavailable, falling back to hash embeddings"
                );
                Self::hash_only(config, e.to_string())
            }
        }
    }

    /// Build a provider around an already constructed dense backend.
    ///
    /// The backend is probed once; a failing probe or a dimension that
    /// contradicts `embedding_dim` puts the provider in fallback mode.
    pub async fn with_dense(config: &EmbeddingConfig, dense: Arc<dyn EmbeddingAdapter>) -> Self {
        let probe = dense
            .embed(EmbeddingInput {
                texts: vec!["test".to_string()],
            })
            .await;

        let probed = match probe {
            Ok(output) => match output.embeddings.first() {
                Some(v) if !v.is_empty() => Ok(v.len()),
                _ => Err("model returned an empty probe embedding".to_string()),
            },
            Err(e) => Err(e.to_string()),
        };

        let reason = match probed {
            Ok(dims) => match config.embedding_dim {
                Some(configured) if configured != dims => format!(
                    "model produces {dims}-dimensional vectors but embedding_dim is {configured}"
                ),
                _ => {
                    let mut provider = Self::base(config, dims);
                    provider.backend = BackendState::Dense {
                        model: dense.model_name().to_string(),
                    };
                    provider.model_name = dense.model_name().to_string();
                    provider.dense = Some(dense);
                    return provider;
                }
            },
            Err(reason) => reason,
        };

        warn!(
            model = %dense.model_name(),
            reason = %reason,
            "embedding model probe failed, falling back to hash embeddings"
        );
        Self::hash_only(config, reason)
    }

    /// Build a provider that only produces hash embeddings.
    pub fn hash_only(config: &EmbeddingConfig, reason: impl Into<String>) -> Self {
        let dims = config
            .embedding_dim
            .or_else(|| known_dimension(&config.model_name))
            .unwrap_or(DEFAULT_DIMENSIONS);
        let mut provider = Self::base(config, dims);
        provider.backend = BackendState::Fallback {
            reason: reason.into(),
        };
        provider
    }

    fn base(config: &EmbeddingConfig, dimensions: usize) -> Self {
        Self {
            model_name: config.model_name.clone(),
            dimensions,
            device: resolve_device(config.device),
            backend: BackendState::Fallback {
                reason: String::new(),
            },
            dense: None,
            hash: HashEmbedder::new(dimensions),
            cache: config
                .cache_enabled
                .then(|| Mutex::new(EmbeddingCache::new(config.cache_size))),
            batch_size: config.batch_size.max(1),
            fallback_count: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &BackendState {
        &self.backend
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Name recorded alongside vectors produced by the active backend.
    pub fn model_name(&self) -> &str {
        if self.dense.is_some() {
            &self.model_name
        } else {
            HASH_MODEL_NAME
        }
    }

    pub fn is_dense(&self) -> bool {
        self.dense.is_some()
    }

    /// Embed one text.
    pub async fn encode(&self, text: &str) -> Vec<f32> {
        self.encode_tagged(text).await.vector
    }

    /// Embed one text and report which model produced the vector.
    pub async fn encode_tagged(&self, text: &str) -> EncodedText {
        let mut encoded = self.encode_batch_tagged(&[text.to_string()]).await;
        encoded.pop().unwrap_or_else(|| EncodedText {
            vector: self.hash.embed_text(text),
            model: HASH_MODEL_NAME.to_string(),
        })
    }

    /// Embed many texts, preserving input order.
    pub async fn encode_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        self.encode_batch_tagged(texts)
            .await
            .into_iter()
            .map(|e| e.vector)
            .collect()
    }

    pub async fn encode_batch_tagged(&self, texts: &[String]) -> Vec<EncodedText> {
        let active_model = self.model_name().to_string();
        let mut results: Vec<Option<EncodedText>> = vec![None; texts.len()];

        if let Some(cache) = &self.cache {
            let cache = lock(cache);
            for (slot, text) in results.iter_mut().zip(texts) {
                if let Some(v) = cache.get(&cache_key(&active_model, text)) {
                    *slot = Some(EncodedText {
                        vector: v.clone(),
                        model: active_model.clone(),
                    });
                }
            }
        }

        let uncached: Vec<usize> = (0..texts.len()).filter(|&i| results[i].is_none()).collect();
        if self.cache.is_some() {
            metrics::record_cache_hits((texts.len() - uncached.len()) as u64);
            metrics::record_cache_misses(uncached.len() as u64);
        }

        // Vectors to cache: only those produced by the active backend.
        let mut fresh: Vec<(usize, Vec<f32>)> = Vec::with_capacity(uncached.len());
        let mut fallbacks = 0u64;

        match &self.dense {
            Some(dense) => {
                for chunk in uncached.chunks(self.batch_size) {
                    for (i, vector) in self.encode_chunk(dense.as_ref(), texts, chunk).await {
                        match vector {
                            Some(v) => fresh.push((i, v)),
                            None => {
                                fallbacks += 1;
                                results[i] = Some(EncodedText {
                                    vector: self.hash.embed_text(&texts[i]),
                                    model: HASH_MODEL_NAME.to_string(),
                                });
                            }
                        }
                    }
                }
            }
            None => {
                fallbacks += uncached.len() as u64;
                fresh.extend(uncached.iter().map(|&i| (i, self.hash.embed_text(&texts[i]))));
            }
        }

        if fallbacks > 0 {
            self.fallback_count.fetch_add(fallbacks, Ordering::Relaxed);
            metrics::record_embedding_fallback(fallbacks);
        }

        if let Some(cache) = &self.cache {
            let mut cache = lock(cache);
            for (i, v) in &fresh {
                cache.insert(cache_key(&active_model, &texts[*i]), v.clone());
            }
        }
        for (i, vector) in fresh {
            results[i] = Some(EncodedText {
                vector,
                model: active_model.clone(),
            });
        }

        results
            .into_iter()
            .zip(texts)
            .map(|(r, text)| {
                r.unwrap_or_else(|| EncodedText {
                    vector: self.hash.embed_text(text),
                    model: HASH_MODEL_NAME.to_string(),
                })
            })
            .collect()
    }

    /// Encode one chunk densely; on failure retry each text alone.
    ///
    /// Returns `None` for texts that still could not be encoded.
    async fn encode_chunk(
        &self,
        dense: &dyn EmbeddingAdapter,
        texts: &[String],
        chunk: &[usize],
    ) -> Vec<(usize, Option<Vec<f32>>)> {
        let input = EmbeddingInput {
            texts: chunk.iter().map(|&i| texts[i].clone()).collect(),
        };
        match dense.embed(input).await {
            Ok(output) if output.embeddings.len() == chunk.len() => {
                return chunk
                    .iter()
                    .zip(output.embeddings)
                    .map(|(&i, v)| (i, self.checked(v)))
                    .collect();
            }
            Ok(output) => warn!(
                expected = chunk.len(),
                got = output.embeddings.len(),
                "embedding batch returned wrong count, retrying texts individually"
            ),
            Err(e) => warn!(
                error = %e,
                size = chunk.len(),
                "embedding batch failed, retrying texts individually"
            ),
        }

        let mut out = Vec::with_capacity(chunk.len());
        for &i in chunk {
            let single = dense
                .embed(EmbeddingInput {
                    texts: vec![texts[i].clone()],
                })
                .await;
            let vector = match single {
                Ok(mut output) if output.embeddings.len() == 1 => {
                    output.embeddings.pop().and_then(|v| self.checked(v))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "embedding failed, using hash fallback for text");
                    None
                }
            };
            out.push((i, vector));
        }
        out
    }

    fn checked(&self, vector: Vec<f32>) -> Option<Vec<f32>> {
        if vector.len() == self.dimensions {
            Some(vector)
        } else {
            warn!(
                expected = self.dimensions,
                got = vector.len(),
                "embedding has wrong dimension, using hash fallback"
            );
            None
        }
    }

    /// Cosine similarity between two vectors.
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }

    pub fn info(&self) -> EmbeddingInfo {
        EmbeddingInfo {
            model_name: self.model_name().to_string(),
            dimensions: self.dimensions,
            device: self.device.to_string(),
            dense_active: self.is_dense(),
            cache_enabled: self.cache.is_some(),
            cache_len: self.cache.as_ref().map_or(0, |c| lock(c).len()),
            fallback_count: self.fallback_count.load(Ordering::Relaxed),
        }
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            lock(cache).clear();
        }
    }
}

fn lock(cache: &Mutex<EmbeddingCache>) -> MutexGuard<'_, EmbeddingCache> {
    // A panic while holding the lock cannot leave the cache half-written.
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resolve the configured device to the one inference actually runs on.
///
/// The bundled ONNX Runtime has only the CPU execution provider.
pub fn resolve_device(requested: Device) -> &'static str {
    match requested {
        Device::Cpu | Device::Auto => "cpu",
        Device::Cuda => {
            warn!("CUDA requested but no CUDA execution provider is available, using CPU");
            "cpu"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_embedder::hash_embedding;
    use mnemo_test_utils::ScriptedEmbedder;
    use tracing_test::traced_test;

    fn config(dim: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            model_name: "scripted".to_string(),
            embedding_dim: Some(dim),
            cache_size: 4,
            batch_size: 2,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn hash_only_is_deterministic() {
        let provider = EmbeddingProvider::hash_only(&config(64), "test");
        let a = provider.encode("aspirin dosage").await;
        provider.clear_cache();
        let b = provider.encode("aspirin dosage").await;
        assert_eq!(a, b);
        assert_eq!(a, hash_embedding("aspirin dosage", 64));
        assert_eq!(provider.model_name(), HASH_MODEL_NAME);
    }

    #[test]
    fn hash_only_dimension_from_registry() {
        let cfg = EmbeddingConfig {
            model_name: "all-mpnet-base-v2".to_string(),
            embedding_dim: None,
            ..EmbeddingConfig::default()
        };
        assert_eq!(EmbeddingProvider::hash_only(&cfg, "x").dimensions(), 768);

        let cfg = EmbeddingConfig {
            model_name: "custom".to_string(),
            embedding_dim: None,
            ..EmbeddingConfig::default()
        };
        assert_eq!(
            EmbeddingProvider::hash_only(&cfg, "x").dimensions(),
            DEFAULT_DIMENSIONS
        );
    }

    #[tokio::test]
    async fn dense_backend_is_used_and_cached() {
        let embedder = Arc::new(ScriptedEmbedder::new(3).with_vector("hello", vec![1.0, 0.0, 0.0]));
        let provider = EmbeddingProvider::with_dense(&config(3), embedder.clone()).await;
        assert!(provider.backend().is_dense());

        let calls_after_probe = embedder.calls();
        assert_eq!(provider.encode("hello").await, vec![1.0, 0.0, 0.0]);
        assert_eq!(provider.encode("hello").await, vec![1.0, 0.0, 0.0]);
        assert_eq!(embedder.calls(), calls_after_probe + 1, "second call is a cache hit");
        assert_eq!(provider.info().cache_len, 1);
        assert_eq!(provider.model_name(), "scripted");
    }

    #[tokio::test]
    async fn cache_is_fifo_bounded() {
        let provider = EmbeddingProvider::hash_only(&config(8), "test");
        for i in 0..10 {
            provider.encode(&format!("text {i}")).await;
        }
        assert_eq!(provider.info().cache_len, 4);
    }

    #[tokio::test]
    async fn failed_chunk_retries_each_text() {
        let embedder = Arc::new(
            ScriptedEmbedder::new(2)
                .with_vector("good-1", vec![1.0, 0.0])
                .with_vector("good-2", vec![0.0, 1.0])
                .failing_on("bad"),
        );
        let provider = EmbeddingProvider::with_dense(&config(2), embedder).await;

        let texts: Vec<String> = ["good-1", "bad", "good-2"].iter().map(|s| s.to_string()).collect();
        let out = provider.encode_batch_tagged(&texts).await;

        assert_eq!(out[0].vector, vec![1.0, 0.0]);
        assert_eq!(out[0].model, "scripted");
        assert_eq!(out[1].vector, hash_embedding("bad", 2));
        assert_eq!(out[1].model, HASH_MODEL_NAME);
        assert_eq!(out[2].vector, vec![0.0, 1.0]);
        assert_eq!(provider.info().fallback_count, 1);
    }

    #[tokio::test]
    async fn per_text_fallback_is_not_cached_under_dense_model() {
        let embedder = Arc::new(ScriptedEmbedder::new(2).failing_on("bad"));
        let provider = EmbeddingProvider::with_dense(&config(2), embedder).await;
        provider.encode("bad").await;
        assert_eq!(provider.info().cache_len, 0);
    }

    #[tokio::test]
    async fn wrong_dimension_output_falls_back() {
        let embedder = Arc::new(ScriptedEmbedder::new(2).with_vector("odd", vec![1.0, 2.0, 3.0]));
        let provider = EmbeddingProvider::with_dense(&config(2), embedder).await;
        assert_eq!(provider.encode("odd").await, hash_embedding("odd", 2));
    }

    #[tokio::test]
    async fn configured_dimension_mismatch_selects_fallback() {
        let embedder = Arc::new(ScriptedEmbedder::new(3));
        let provider = EmbeddingProvider::with_dense(&config(5), embedder).await;
        assert!(!provider.is_dense());
        assert_eq!(provider.dimensions(), 5);
        match provider.backend() {
            BackendState::Fallback { reason } => assert!(reason.contains("embedding_dim is 5")),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn failing_probe_logs_fallback_warning() {
        let embedder = Arc::new(ScriptedEmbedder::new(4).always_failing());
        let provider = EmbeddingProvider::with_dense(&config(4), embedder).await;
        assert!(!provider.is_dense());
        assert_eq!(provider.encode("anything").await, hash_embedding("anything", 4));
        assert!(logs_contain("falling back to hash embeddings"));
    }

    #[tokio::test]
    #[traced_test]
    async fn missing_model_files_fall_back_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EmbeddingConfig {
            auto_download: false,
            ..EmbeddingConfig::default()
        };
        let provider = EmbeddingProvider::from_config(&cfg, dir.path()).await;
        assert!(!provider.is_dense());
        assert_eq!(provider.dimensions(), 384);
        assert!(logs_contain("embedding model unavailable"));
    }

    #[tokio::test]
    async fn hash_backend_skips_model_loading() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EmbeddingConfig {
            backend: EmbeddingBackend::Hash,
            ..EmbeddingConfig::default()
        };
        let provider = EmbeddingProvider::from_config(&cfg, dir.path()).await;
        assert_eq!(
            provider.backend(),
            &BackendState::Fallback {
                reason: "hash backend selected by configuration".to_string()
            }
        );
        assert!(!dir.path().join("models").exists());
    }

    #[tokio::test]
    async fn cache_disabled_reports_zero_length() {
        let cfg = EmbeddingConfig {
            cache_enabled: false,
            ..config(8)
        };
        let provider = EmbeddingProvider::hash_only(&cfg, "test");
        provider.encode("a").await;
        let info = provider.info();
        assert!(!info.cache_enabled);
        assert_eq!(info.cache_len, 0);
        assert_eq!(info.device, "cpu");
    }

    #[test]
    fn similarity_delegates_to_cosine() {
        let provider = EmbeddingProvider::hash_only(&config(2), "test");
        assert!((provider.similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(provider.similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn cuda_resolves_to_cpu() {
        assert_eq!(resolve_device(Device::Cuda), "cpu");
        assert_eq!(resolve_device(Device::Auto), "cpu");
    }
}
