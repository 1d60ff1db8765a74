// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX cross-encoder for joint (query, document) relevance scoring.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use ort::session::Session;
use tokenizers::{EncodeInput, Tokenizer};
use tracing::debug;

use mnemo_core::error::MnemoError;
use mnemo_core::traits::RerankAdapter;
use mnemo_core::traits::adapter::PluginAdapter;
use mnemo_core::types::{AdapterType, HealthStatus};

use crate::embedder::{load_session, load_tokenizer, run_model, tokenize_batch};

/// Cross-encoder relevance model such as `bge-reranker-base`.
pub struct OnnxCrossEncoder {
    model_name: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    token_type_ids: AtomicBool,
}

impl OnnxCrossEncoder {
    pub fn new(
        model_name: impl Into<String>,
        model_path: &Path,
        tokenizer_path: &Path,
        max_seq_length: usize,
        intra_threads: usize,
    ) -> Result<Self, MnemoError> {
        let model_name = model_name.into();
        let tokenizer = load_tokenizer(tokenizer_path, max_seq_length)?;
        let session = load_session(&model_name, model_path, intra_threads)?;
        debug!(model = %model_name, "cross-encoder loaded");
        Ok(Self {
            model_name,
            session: Mutex::new(session),
            tokenizer,
            token_type_ids: AtomicBool::new(true),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Sigmoid relevance for each `(query, document)` pair.
    pub fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, MnemoError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<EncodeInput<'_>> = documents
            .iter()
            .map(|doc| (query, doc.as_str()).into())
            .collect();
        let batch = tokenize_batch(&self.tokenizer, pairs)?;
        let (shape, logits) = run_model(&self.session, &batch, &self.token_type_ids)?;

        let scores = relevance_logits(&shape, &logits)?;
        if scores.len() != documents.len() {
            return Err(MnemoError::Rerank(format!(
                "cross-encoder returned {} scores for {} documents",
                scores.len(),
                documents.len()
            )));
        }
        Ok(scores.into_iter().map(sigmoid).collect())
    }
}

/// Pick the relevance logit per row.
///
/// Single-logit models use column 0; two-class models use the positive class.
fn relevance_logits(shape: &[i64], logits: &[f32]) -> Result<Vec<f32>, MnemoError> {
    let (rows, columns) = match shape {
        [rows] => (*rows, 1),
        [rows, columns @ (1 | 2)] => (*rows, *columns),
        other => {
            return Err(MnemoError::Rerank(format!(
                "unexpected cross-encoder output shape {other:?}"
            )));
        }
    };
    let short = || {
        MnemoError::Rerank(format!(
            "cross-encoder output shape {shape:?} does not fit {} logits",
            logits.len()
        ))
    };
    let rows = usize::try_from(rows).map_err(|_| short())?;
    let columns = columns as usize;
    let needed = rows.checked_mul(columns).ok_or_else(short)?;
    let logits = logits.get(..needed).ok_or_else(short)?;
    // Two-class models score the positive class in the last column.
    Ok(logits.chunks_exact(columns).filter_map(|row| row.last().copied()).collect())
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[async_trait]
impl PluginAdapter for OnnxCrossEncoder {
    fn name(&self) -> &str {
        "onnx-cross-encoder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reranker
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
impl RerankAdapter for OnnxCrossEncoder {
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, MnemoError> {
        self.score(query, documents)
    }
}
