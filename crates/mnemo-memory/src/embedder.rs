// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX embedding adapter for local sentence-transformer inference.
//!
//! Any BERT-style sentence embedding model exported to ONNX works: outputs of
//! shape `[batch, seq, hidden]` are mean-pooled over the attention mask,
//! outputs of shape `[batch, hidden]` are taken as already pooled.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tokenizers::{EncodeInput, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::debug;

use mnemo_core::error::MnemoError;
use mnemo_core::traits::EmbeddingAdapter;
use mnemo_core::traits::adapter::PluginAdapter;
use mnemo_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

/// Load-time options for [`OnnxEmbedder`].
#[derive(Debug, Clone)]
pub struct OnnxOptions {
    /// Inputs are truncated to this many tokens.
    pub max_seq_length: usize,
    /// L2-normalize output vectors.
    pub normalize: bool,
    pub intra_threads: usize,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            max_seq_length: 512,
            normalize: true,
            intra_threads: 1,
        }
    }
}

/// ONNX-based embedding adapter.
pub struct OnnxEmbedder {
    model_name: String,
    /// ONNX Runtime session; `run` needs exclusive access.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    normalize: bool,
    /// Cleared after the model rejects a `token_type_ids` input.
    token_type_ids: AtomicBool,
}

impl OnnxEmbedder {
    /// Creates a new ONNX embedder from model and tokenizer files on disk.
    pub fn new(
        model_name: impl Into<String>,
        model_path: &Path,
        tokenizer_path: &Path,
        options: &OnnxOptions,
    ) -> Result<Self, MnemoError> {
        let model_name = model_name.into();
        let tokenizer = load_tokenizer(tokenizer_path, options.max_seq_length)?;
        let session = load_session(&model_name, model_path, options.intra_threads)?;
        debug!(model = %model_name, path = %model_path.display(), "ONNX embedder loaded");

        Ok(Self {
            model_name,
            session: Mutex::new(session),
            tokenizer,
            normalize: options.normalize,
            token_type_ids: AtomicBool::new(true),
        })
    }

    /// Embed a single text string.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, MnemoError> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| MnemoError::Encode("model returned no embedding".to_string()))
    }

    /// Embed a batch of texts in one forward pass.
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, MnemoError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inputs: Vec<EncodeInput<'_>> = texts.iter().map(|&t| t.into()).collect();
        let batch = tokenize_batch(&self.tokenizer, inputs)?;
        let (shape, data) = run_model(&self.session, &batch, &self.token_type_ids)?;
        let elements = shape.iter().try_fold(1usize, |acc, &dim| {
            usize::try_from(dim).ok().and_then(|dim| acc.checked_mul(dim))
        });
        if elements.is_none_or(|n| data.len() < n) {
            return Err(MnemoError::Encode(format!(
                "embedding output shape {shape:?} does not fit {} values",
                data.len()
            )));
        }

        let rows = match shape.as_slice() {
            [b, seq, hidden] => {
                let (b, seq, hidden) = (*b as usize, *seq as usize, *hidden as usize);
                if batch.attention_mask.len() < b * seq {
                    return Err(MnemoError::Encode(format!(
                        "attention mask holds {} entries for {b}x{seq} tokens",
                        batch.attention_mask.len()
                    )));
                }
                (0..b)
                    .map(|i| {
                        let start = i * seq * hidden;
                        let mask = &batch.attention_mask[i * seq..(i + 1) * seq];
                        mean_pool_with_attention(
                            &data[start..start + seq * hidden],
                            mask,
                            seq,
                            hidden,
                        )
                    })
                    .collect::<Vec<_>>()
            }
            [b, hidden] => {
                let hidden = *hidden as usize;
                (0..*b as usize)
                    .map(|i| data[i * hidden..(i + 1) * hidden].to_vec())
                    .collect()
            }
            other => {
                return Err(MnemoError::Encode(format!(
                    "unexpected embedding output shape {other:?}"
                )));
            }
        };

        if rows.len() != texts.len() {
            return Err(MnemoError::Encode(format!(
                "model returned {} embeddings for {} inputs",
                rows.len(),
                texts.len()
            )));
        }

        Ok(if self.normalize {
            rows.iter().map(|r| l2_normalize(r)).collect()
        } else {
            rows
        })
    }
}

/// Token tensors for one padded batch, flattened row-major.
pub(crate) struct TokenBatch {
    pub rows: usize,
    pub seq_len: usize,
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

pub(crate) fn load_tokenizer(path: &Path, max_length: usize) -> Result<Tokenizer, MnemoError> {
    let mut tokenizer = Tokenizer::from_file(path).map_err(|e| MnemoError::ModelUnavailable {
        model: path.display().to_string(),
        reason: format!("failed to load tokenizer: {e}"),
    })?;

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| MnemoError::Internal(format!("Failed to configure truncation: {e}")))?;

    Ok(tokenizer)
}

pub(crate) fn load_session(
    model_name: &str,
    model_path: &Path,
    intra_threads: usize,
) -> Result<Session, MnemoError> {
    let unavailable = |reason: String| MnemoError::ModelUnavailable {
        model: model_name.to_string(),
        reason,
    };

    Session::builder()
        .map_err(|e| unavailable(format!("failed to create ONNX session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| unavailable(format!("failed to set optimization level: {e}")))?
        .with_intra_threads(intra_threads.max(1))
        .map_err(|e| unavailable(format!("failed to set thread count: {e}")))?
        .commit_from_file(model_path)
        .map_err(|e| {
            unavailable(format!(
                "failed to load ONNX model from {}: {e}",
                model_path.display()
            ))
        })
}

pub(crate) fn tokenize_batch(
    tokenizer: &Tokenizer,
    inputs: Vec<EncodeInput<'_>>,
) -> Result<TokenBatch, MnemoError> {
    let encodings = tokenizer
        .encode_batch(inputs, true)
        .map_err(|e| MnemoError::Encode(format!("Tokenization failed: {e}")))?;

    let rows = encodings.len();
    let seq_len = encodings.first().map_or(0, |e| e.get_ids().len());
    let mut batch = TokenBatch {
        rows,
        seq_len,
        input_ids: Vec::with_capacity(rows * seq_len),
        attention_mask: Vec::with_capacity(rows * seq_len),
        token_type_ids: Vec::with_capacity(rows * seq_len),
    };

    for encoding in &encodings {
        if encoding.get_ids().len() != seq_len {
            return Err(MnemoError::Encode(
                "tokenizer produced ragged batch".to_string(),
            ));
        }
        batch
            .input_ids
            .extend(encoding.get_ids().iter().map(|&id| i64::from(id)));
        batch
            .attention_mask
            .extend(encoding.get_attention_mask().iter().map(|&m| i64::from(m)));
        batch
            .token_type_ids
            .extend(encoding.get_type_ids().iter().map(|&t| i64::from(t)));
    }

    Ok(batch)
}

/// Run one forward pass and copy out the first output tensor.
///
/// Models without a `token_type_ids` input (XLM-R and friends) are detected
/// on the first call and `with_token_types` is cleared for later calls.
pub(crate) fn run_model(
    session: &Mutex<Session>,
    batch: &TokenBatch,
    with_token_types: &AtomicBool,
) -> Result<(Vec<i64>, Vec<f32>), MnemoError> {
    let shape = (batch.rows, batch.seq_len);
    let tensor_err = |e: ndarray::ShapeError| MnemoError::Encode(format!("Failed to create tensor: {e}"));
    let input_ids = Array2::from_shape_vec(shape, batch.input_ids.clone()).map_err(tensor_err)?;
    let attention_mask =
        Array2::from_shape_vec(shape, batch.attention_mask.clone()).map_err(tensor_err)?;
    let token_type_ids =
        Array2::from_shape_vec(shape, batch.token_type_ids.clone()).map_err(tensor_err)?;

    let mut session = session
        .lock()
        .map_err(|e| MnemoError::Internal(format!("Failed to lock ONNX session: {e}")))?;

    let ref_err = |e: ort::Error| MnemoError::Encode(format!("Failed to create TensorRef: {e}"));

    if with_token_types.load(Ordering::Relaxed) {
        let result = session.run(ort::inputs![
            "input_ids" => TensorRef::from_array_view(&input_ids).map_err(ref_err)?,
            "attention_mask" => TensorRef::from_array_view(&attention_mask).map_err(ref_err)?,
            "token_type_ids" => TensorRef::from_array_view(&token_type_ids).map_err(ref_err)?
        ]);
        match result {
            Ok(outputs) => return extract_first(&outputs),
            Err(e) => {
                debug!(error = %e, "inference with token_type_ids failed, retrying without");
                with_token_types.store(false, Ordering::Relaxed);
            }
        }
    }

    let outputs = session
        .run(ort::inputs![
            "input_ids" => TensorRef::from_array_view(&input_ids).map_err(ref_err)?,
            "attention_mask" => TensorRef::from_array_view(&attention_mask).map_err(ref_err)?
        ])
        .map_err(|e| MnemoError::Encode(format!("ONNX inference failed: {e}")))?;
    extract_first(&outputs)
}

fn extract_first(
    outputs: &ort::session::SessionOutputs<'_>,
) -> Result<(Vec<i64>, Vec<f32>), MnemoError> {
    let (shape, data) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| MnemoError::Encode(format!("Failed to extract output tensor: {e}")))?;
    Ok((shape.to_vec(), data.to_vec()))
}

/// Apply attention-masked mean pooling over token embeddings.
fn mean_pool_with_attention(
    embeddings: &[f32],
    attention_mask: &[i64],
    seq_len: usize,
    hidden_size: usize,
) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (i, &mask) in attention_mask.iter().enumerate().take(seq_len) {
        if mask > 0 {
            let token = &embeddings[i * hidden_size..(i + 1) * hidden_size];
            for (acc, v) in sum.iter_mut().zip(token) {
                *acc += v;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for val in &mut sum {
            *val /= count;
        }
    }

    sum
}

/// L2-normalize a vector.
pub(crate) fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}

#[async_trait]
impl PluginAdapter for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        match self.session.lock() {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Session lock poisoned: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OnnxEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        let texts: Vec<&str> = input.texts.iter().map(String::as_str).collect();
        let embeddings = self.embed_batch(&texts)?;
        let dimensions = embeddings.first().map_or(0, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
