// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Mnemo workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Embedding,
    Reranker,
    Extractor,
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingInput {
    /// Texts to embed, in order.
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,
    /// Dimensionality of every vector in `embeddings`.
    pub dimensions: usize,
}

// --- Persistence records ---

/// A conversation as stored by the persistence backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub user_id: i64,
    pub title: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A persisted message with its optional embedding columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub model_used: Option<String>,
    /// Little-endian f32 BLOB as stored; may be malformed.
    pub embedding: Option<Vec<u8>>,
    pub embedding_model: Option<String>,
    pub vector_id: Option<String>,
    pub created_at: String,
}

/// Fields supplied when writing a new message.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub model_used: Option<String>,
}

/// Per-conversation summary vector with its extracted signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationVectorRecord {
    pub conversation_id: String,
    pub user_id: i64,
    /// Raw BLOB; `None` when the column is NULL.
    pub summary_embedding: Option<Vec<u8>>,
    pub key_entities: Vec<String>,
    pub topics: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Values written by a conversation-vector upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationVectorUpsert {
    pub conversation_id: String,
    pub user_id: i64,
    pub summary_embedding: Vec<f32>,
    pub key_entities: Vec<String>,
    pub topics: Vec<String>,
}

/// Summary, entities, and topics derived from a message history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationDigest {
    pub summary: String,
    pub key_entities: Vec<String>,
    pub topics: Vec<String>,
}

/// One turn of the active conversation, used for context-aware reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

impl From<&Message> for ConversationTurn {
    fn from(message: &Message) -> Self {
        Self::new(message.role.clone(), message.content.clone())
    }
}

/// Row counts reported by the storage backend for `stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorCounts {
    pub conversations: u64,
    pub conversation_vectors: u64,
    pub messages: u64,
    pub embedded_messages: u64,
}
