// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service wiring shared by the subcommands.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_memory::{ContextAssembler, ConversationReranker, EmbeddingProvider, KeywordExtractor, VectorStore};
use mnemo_storage::SqliteStorage;

/// Opened storage plus the embedding provider, built once per invocation.
pub struct App {
    config: MnemoConfig,
    store: Arc<VectorStore>,
}

impl App {
    pub async fn open(config: &MnemoConfig) -> Result<Self, MnemoError> {
        let data_dir = PathBuf::from(&config.runtime.data_dir);
        let storage = SqliteStorage::open(config.storage.clone()).await?;
        let embeddings = EmbeddingProvider::from_config(&config.embedding, &data_dir).await;
        info!(
            model = embeddings.model_name(),
            dimensions = embeddings.dimensions(),
            dense = embeddings.is_dense(),
            "embedding provider ready"
        );

        let store = VectorStore::new(
            Arc::new(storage),
            Arc::new(embeddings),
            Arc::new(KeywordExtractor::default()),
        );
        Ok(Self {
            config: config.clone(),
            store: Arc::new(store),
        })
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Assembler with the configured reranker, or none when `rerank` is off
    /// or `reranker.enabled` is false.
    pub async fn assembler(&self, rerank: bool) -> ContextAssembler {
        let reranker = if rerank && self.config.reranker.enabled {
            let data_dir = PathBuf::from(&self.config.runtime.data_dir);
            Some(
                ConversationReranker::from_config(
                    &self.config.reranker,
                    &self.config.embedding,
                    &data_dir,
                )
                .await,
            )
        } else {
            None
        };
        ContextAssembler::new(self.store.clone(), reranker, self.config.retrieval.clone())
    }
}
