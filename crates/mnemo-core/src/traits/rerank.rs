// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rerank adapter trait for joint query/document relevance models.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;

/// A learned relevance model that scores `(query, document)` pairs jointly.
#[async_trait]
pub trait RerankAdapter: PluginAdapter {
    /// Returns one score in `[0, 1]` per document, in document order.
    async fn score_pairs(&self, query: &str, documents: &[String])
    -> Result<Vec<f32>, MnemoError>;
}
