// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent-facing tools over the context assembler.
//!
//! Both tools take `{"query": "..."}` and return formatted text. Conditions a
//! model can react to (no user, nothing found, degraded storage) come back as
//! [`ToolOutput`] content rather than errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mnemo_core::error::MnemoError;

use crate::assembler::ContextAssembler;
use crate::types::{ContextEntry, RetrievalStatus};

/// Output from a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Unified interface the agent loop invokes tools through.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the tool's input.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, MnemoError>;
}

fn query_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        },
        "required": ["query"]
    })
}

fn required_query(input: &serde_json::Value) -> Result<&str, MnemoError> {
    input["query"]
        .as_str()
        .ok_or_else(|| MnemoError::Internal("missing required 'query' parameter".to_string()))
}

/// Searches a user's past conversations and lists the best matches in detail.
pub struct MemorySearchTool {
    assembler: Arc<ContextAssembler>,
    user_id: Option<i64>,
    top_k: usize,
}

impl MemorySearchTool {
    pub fn new(assembler: Arc<ContextAssembler>, user_id: Option<i64>) -> Self {
        Self {
            assembler,
            user_id,
            top_k: 5,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

#[async_trait]
impl Tool for MemorySearchTool {
    fn name(&self) -> &str {
        "memory_search"
    }

    fn description(&self) -> &str {
        "Search the user's past conversations for the ones most relevant to a question. \
         Returns relevance scores, topics and key entities for each match."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("Text to search past conversations for")
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, MnemoError> {
        let query = required_query(&input)?;
        let Some(user_id) = self.user_id else {
            return Ok(ToolOutput::error("Error: no user id set, cannot search"));
        };

        let context = self
            .assembler
            .get_relevant_context(user_id, query, None, Some(self.top_k), &[])
            .await;

        match context.status {
            RetrievalStatus::Degraded { reason } => {
                Ok(ToolOutput::error(format!("Search failed: {reason}")))
            }
            RetrievalStatus::Empty => Ok(ToolOutput::ok("No conversation history found")),
            RetrievalStatus::Ranked { .. } if context.entries.is_empty() => {
                Ok(ToolOutput::ok("No relevant past conversations found"))
            }
            RetrievalStatus::Ranked { .. } => Ok(ToolOutput::ok(format_search(&context.entries))),
        }
    }
}

fn format_search(entries: &[ContextEntry]) -> String {
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        lines.push(format!("Related conversation {}:", i + 1));
        lines.push(format!("  Conversation ID: {}", entry.conversation_id));
        lines.push(format!("  Relevance score: {:.3}", entry.relevance_score));
        lines.push(format!("  Similarity: {:.3}", entry.similarity));
        if !entry.topics.is_empty() {
            lines.push(format!("  Topics: {}", entry.topics.join(", ")));
        }
        if !entry.entities.is_empty() {
            lines.push(format!("  Key entities: {}", entry.entities.join(", ")));
        }
        if !entry.content_digest.is_empty() {
            lines.push(format!("  Summary: {}", entry.content_digest));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Summarizes related history for inclusion in the active conversation's prompt.
pub struct ContextEnhancementTool {
    assembler: Arc<ContextAssembler>,
    user_id: Option<i64>,
    conversation_id: Option<String>,
    top_k: usize,
}

impl ContextEnhancementTool {
    pub fn new(
        assembler: Arc<ContextAssembler>,
        user_id: Option<i64>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            assembler,
            user_id,
            conversation_id,
            top_k: 3,
        }
    }
}

#[async_trait]
impl Tool for ContextEnhancementTool {
    fn name(&self) -> &str {
        "context_enhancement"
    }

    fn description(&self) -> &str {
        "Find past conversations related to the current discussion and summarize them \
         so the answer can stay consistent with what was discussed before."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("Current conversation content or question")
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, MnemoError> {
        let query = required_query(&input)?;
        let Some(user_id) = self.user_id else {
            return Ok(ToolOutput::error(
                "Error: no user id set, cannot enhance context",
            ));
        };

        let context = self
            .assembler
            .get_relevant_context(
                user_id,
                query,
                self.conversation_id.as_deref(),
                Some(self.top_k),
                &[],
            )
            .await;

        if let RetrievalStatus::Degraded { reason } = &context.status {
            return Ok(ToolOutput::error(format!("Context enhancement failed: {reason}")));
        }
        if context.entries.is_empty() {
            return Ok(ToolOutput::ok(
                "No related past conversations found to enhance the context",
            ));
        }
        Ok(ToolOutput::ok(format_enhancement(&context.entries)))
    }
}

fn format_enhancement(entries: &[ContextEntry]) -> String {
    let mut lines = vec!["Context from past conversations:".to_string(), String::new()];
    for (i, entry) in entries.iter().enumerate() {
        lines.push(format!(
            "Related history {} (relevance: {:.2}):",
            i + 1,
            entry.relevance_score
        ));
        if !entry.topics.is_empty() {
            lines.push(format!("  Topics: {}", entry.topics.join(", ")));
        }
        if !entry.entities.is_empty() {
            lines.push(format!("  Entities: {}", entry.entities.join(", ")));
        }
        lines.push(String::new());
    }
    lines.push(
        "Suggestion: use these past conversations to keep the answer consistent and personal."
            .to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_config::model::{EmbeddingConfig, RerankerConfig, RetrievalConfig};
    use mnemo_test_utils::{FailingStorage, ScriptedEmbedder, TestHarness};

    use crate::embedding::EmbeddingProvider;
    use crate::extractor::KeywordExtractor;
    use crate::reranker::ConversationReranker;
    use crate::vector_store::VectorStore;

    fn entry(id: &str, relevance: f32, topics: &[&str], entities: &[&str]) -> ContextEntry {
        ContextEntry {
            conversation_id: id.to_string(),
            similarity: 0.6,
            relevance_score: relevance,
            topics: topics.iter().map(|s| s.to_string()).collect(),
            entities: entities.iter().map(|s| s.to_string()).collect(),
            content_digest: "Key entities: Aspirin | Topics: history".to_string(),
        }
    }

    async fn assembler(harness: &TestHarness) -> Arc<ContextAssembler> {
        let embedder = ScriptedEmbedder::new(2)
            .with_vector("aspirin", vec![1.0, 0.0])
            .with_vector("aspirin history", vec![0.8, 0.6]);
        let config = EmbeddingConfig {
            embedding_dim: Some(2),
            ..EmbeddingConfig::default()
        };
        let provider = Arc::new(EmbeddingProvider::with_dense(&config, Arc::new(embedder)).await);
        let store = Arc::new(VectorStore::new(
            harness.storage(),
            provider,
            Arc::new(KeywordExtractor::default()),
        ));
        for id in ["c1", "c2"] {
            harness.create_conversation(id, 1).await.unwrap();
            store
                .store_conversation_summary(
                    id,
                    1,
                    "aspirin history",
                    &["Aspirin".to_string()],
                    &["history".to_string()],
                )
                .await;
        }
        Arc::new(ContextAssembler::new(
            store,
            Some(ConversationReranker::heuristic(&RerankerConfig::default())),
            RetrievalConfig::default(),
        ))
    }

    #[test]
    fn search_format_lists_every_field() {
        let text = format_search(&[entry("c1", 0.645, &["history"], &["Aspirin"])]);
        assert_eq!(
            text,
            "Related conversation 1:\n  Conversation ID: c1\n  Relevance score: 0.645\n  \
             Similarity: 0.600\n  Topics: history\n  Key entities: Aspirin\n  \
             Summary: Key entities: Aspirin | Topics: history\n"
        );
    }

    #[test]
    fn enhancement_format_omits_empty_lists() {
        let text = format_enhancement(&[entry("c1", 0.5, &[], &[])]);
        assert!(text.starts_with("Context from past conversations:\n\nRelated history 1 (relevance: 0.50):\n"));
        assert!(!text.contains("Topics:"));
        assert!(text.ends_with("consistent and personal."));
    }

    #[tokio::test]
    async fn search_without_user_is_tool_error() {
        let harness = TestHarness::new().await.unwrap();
        let tool = MemorySearchTool::new(assembler(&harness).await, None);
        let out = tool.invoke(serde_json::json!({"query": "aspirin"})).await.unwrap();
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn missing_query_is_error() {
        let harness = TestHarness::new().await.unwrap();
        let tool = MemorySearchTool::new(assembler(&harness).await, Some(1));
        assert!(tool.invoke(serde_json::json!({})).await.is_err());
        assert_eq!(tool.parameters_schema()["required"][0], "query");
    }

    #[tokio::test]
    async fn search_returns_formatted_matches() {
        let harness = TestHarness::new().await.unwrap();
        let tool = MemorySearchTool::new(assembler(&harness).await, Some(1));
        let out = tool.invoke(serde_json::json!({"query": "aspirin"})).await.unwrap();
        assert!(!out.is_error);
        assert!(out.content.contains("Related conversation 1:"));
        assert!(out.content.contains("Related conversation 2:"));
        assert!(out.content.contains("Key entities: Aspirin"));
    }

    #[tokio::test]
    async fn search_for_unknown_user_reports_no_history() {
        let harness = TestHarness::new().await.unwrap();
        let tool = MemorySearchTool::new(assembler(&harness).await, Some(99));
        let out = tool.invoke(serde_json::json!({"query": "aspirin"})).await.unwrap();
        assert_eq!(out.content, "No conversation history found");
    }

    #[tokio::test]
    async fn enhancement_excludes_active_conversation() {
        let harness = TestHarness::new().await.unwrap();
        let tool =
            ContextEnhancementTool::new(assembler(&harness).await, Some(1), Some("c1".to_string()));
        let out = tool.invoke(serde_json::json!({"query": "aspirin"})).await.unwrap();
        assert!(out.content.contains("Related history 1"));
        assert!(!out.content.contains("Related history 2"));
    }

    #[tokio::test]
    async fn degraded_storage_is_reported() {
        let config = EmbeddingConfig::default();
        let store = Arc::new(VectorStore::new(
            Arc::new(FailingStorage),
            Arc::new(EmbeddingProvider::hash_only(&config, "test")),
            Arc::new(KeywordExtractor::default()),
        ));
        let assembler = Arc::new(ContextAssembler::new(store, None, RetrievalConfig::default()));
        let tool = ContextEnhancementTool::new(assembler, Some(1), None);
        let out = tool.invoke(serde_json::json!({"query": "x"})).await.unwrap();
        assert!(out.is_error);
    }
}
