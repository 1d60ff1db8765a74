// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo embed` command implementation.

use std::path::PathBuf;

use serde::Serialize;

use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_memory::EmbeddingProvider;

#[derive(Debug, Serialize)]
struct EmbedResponse<'a> {
    model: &'a str,
    dimensions: usize,
    vector: &'a [f32],
}

/// Embed `text` without opening storage and print the tagged vector as JSON.
pub async fn run_embed(config: &MnemoConfig, text: &str) -> Result<(), MnemoError> {
    let data_dir = PathBuf::from(&config.runtime.data_dir);
    let provider = EmbeddingProvider::from_config(&config.embedding, &data_dir).await;
    let encoded = provider.encode_tagged(text).await;

    let response = EmbedResponse {
        model: &encoded.model,
        dimensions: encoded.vector.len(),
        vector: &encoded.vector,
    };
    let rendered = serde_json::to_string(&response)
        .map_err(|e| MnemoError::Internal(format!("failed to render embedding: {e}")))?;
    println!("{rendered}");
    Ok(())
}
