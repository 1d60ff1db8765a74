// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-output and always-failing adapters.

use async_trait::async_trait;

use mnemo_core::traits::adapter::PluginAdapter;
use mnemo_core::types::{
    AdapterType, Conversation, ConversationDigest, ConversationVectorRecord,
    ConversationVectorUpsert, HealthStatus, Message, NewMessage, VectorCounts,
};
use mnemo_core::{EntityExtractor, MnemoError, RerankAdapter, StorageAdapter};

/// An extractor that returns the same digest for every history.
pub struct MockExtractor {
    digest: ConversationDigest,
    failing_conversation: Option<String>,
}

impl MockExtractor {
    pub fn new(summary: &str, entities: &[&str], topics: &[&str]) -> Self {
        Self {
            digest: ConversationDigest {
                summary: summary.to_string(),
                key_entities: entities.iter().map(|s| s.to_string()).collect(),
                topics: topics.iter().map(|s| s.to_string()).collect(),
            },
            failing_conversation: None,
        }
    }

    /// Fail extraction for histories belonging to `conversation_id`.
    pub fn failing_for(mut self, conversation_id: &str) -> Self {
        self.failing_conversation = Some(conversation_id.to_string());
        self
    }
}

#[async_trait]
impl PluginAdapter for MockExtractor {
    fn name(&self) -> &str {
        "mock-extractor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EntityExtractor for MockExtractor {
    async fn extract(&self, messages: &[Message]) -> Result<ConversationDigest, MnemoError> {
        if let Some(failing) = &self.failing_conversation {
            if messages.iter().any(|m| &m.conversation_id == failing) {
                return Err(MnemoError::Extraction(format!("cannot digest {failing}")));
            }
        }
        Ok(self.digest.clone())
    }
}

fn unavailable() -> MnemoError {
    MnemoError::Storage {
        source: "storage unavailable".into(),
    }
}

/// A storage adapter whose every operation fails.
pub struct FailingStorage;

#[async_trait]
impl PluginAdapter for FailingStorage {
    fn name(&self) -> &str {
        "failing-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Unhealthy("storage unavailable".into()))
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for FailingStorage {
    async fn initialize(&self) -> Result<(), MnemoError> {
        Err(unavailable())
    }

    async fn close(&self) -> Result<(), MnemoError> {
        Err(unavailable())
    }

    async fn create_conversation(&self, _conversation: &Conversation) -> Result<(), MnemoError> {
        Err(unavailable())
    }

    async fn get_conversation(&self, _id: &str) -> Result<Option<Conversation>, MnemoError> {
        Err(unavailable())
    }

    async fn list_conversations(&self, _user_id: i64) -> Result<Vec<Conversation>, MnemoError> {
        Err(unavailable())
    }

    async fn insert_message(&self, _message: &NewMessage) -> Result<i64, MnemoError> {
        Err(unavailable())
    }

    async fn get_message(&self, _id: i64) -> Result<Option<Message>, MnemoError> {
        Err(unavailable())
    }

    async fn get_messages(&self, _conversation_id: &str) -> Result<Vec<Message>, MnemoError> {
        Err(unavailable())
    }

    async fn set_message_embedding(
        &self,
        _message_id: i64,
        _embedding: &[f32],
        _model: &str,
        _vector_id: &str,
    ) -> Result<bool, MnemoError> {
        Err(unavailable())
    }

    async fn upsert_conversation_vector(
        &self,
        _record: &ConversationVectorUpsert,
    ) -> Result<(), MnemoError> {
        Err(unavailable())
    }

    async fn get_conversation_vector(
        &self,
        _conversation_id: &str,
    ) -> Result<Option<ConversationVectorRecord>, MnemoError> {
        Err(unavailable())
    }

    async fn list_conversation_vectors(
        &self,
        _user_id: i64,
        _exclude_conversation_id: Option<&str>,
    ) -> Result<Vec<ConversationVectorRecord>, MnemoError> {
        Err(unavailable())
    }

    async fn count_vectors(&self) -> Result<VectorCounts, MnemoError> {
        Err(unavailable())
    }
}

/// A rerank model whose scoring always fails.
pub struct FailingRerankAdapter;

#[async_trait]
impl PluginAdapter for FailingRerankAdapter {
    fn name(&self) -> &str {
        "failing-reranker"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reranker
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl RerankAdapter for FailingRerankAdapter {
    async fn score_pairs(
        &self,
        _query: &str,
        _documents: &[String],
    ) -> Result<Vec<f32>, MnemoError> {
        Err(MnemoError::Rerank("scripted rerank failure".into()))
    }
}
