// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Conversation, ConversationVectorRecord, ConversationVectorUpsert, Message, NewMessage,
    VectorCounts,
};

/// Adapter for storage and persistence backends.
///
/// Storage adapters own conversations, their messages, and the
/// per-conversation summary vectors used for retrieval.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), MnemoError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), MnemoError>;

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), MnemoError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, MnemoError>;

    /// Lists a user's conversations, most recently updated first.
    async fn list_conversations(&self, user_id: i64) -> Result<Vec<Conversation>, MnemoError>;

    // --- Message operations ---

    /// Inserts a message, bumps the conversation's `updated_at`, and returns the new id.
    async fn insert_message(&self, message: &NewMessage) -> Result<i64, MnemoError>;

    async fn get_message(&self, id: i64) -> Result<Option<Message>, MnemoError>;

    /// Returns a conversation's messages in chronological order.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, MnemoError>;

    /// Writes the embedding columns of a message. Returns `false` if no such message exists.
    async fn set_message_embedding(
        &self,
        message_id: i64,
        embedding: &[f32],
        model: &str,
        vector_id: &str,
    ) -> Result<bool, MnemoError>;

    // --- Conversation vector operations ---

    /// Creates the record if absent, else overwrites it and bumps `updated_at`.
    async fn upsert_conversation_vector(
        &self,
        record: &ConversationVectorUpsert,
    ) -> Result<(), MnemoError>;

    async fn get_conversation_vector(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationVectorRecord>, MnemoError>;

    /// Lists a user's conversation vectors, optionally excluding one conversation.
    async fn list_conversation_vectors(
        &self,
        user_id: i64,
        exclude_conversation_id: Option<&str>,
    ) -> Result<Vec<ConversationVectorRecord>, MnemoError>;

    async fn count_vectors(&self) -> Result<VectorCounts, MnemoError>;
}
