// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Mnemo collaborator seams.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod embedding;
pub mod extractor;
pub mod rerank;
pub mod storage;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PluginAdapter;
pub use embedding::EmbeddingAdapter;
pub use extractor::EntityExtractor;
pub use rerank::RerankAdapter;
pub use storage::StorageAdapter;
