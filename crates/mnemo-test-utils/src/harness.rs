// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for storage-backed integration testing.
//!
//! `TestHarness` opens a migrated SQLite database in a temp directory and
//! offers helpers for seeding conversations and messages.

use std::sync::Arc;

use mnemo_config::model::StorageConfig;
use mnemo_core::types::{Conversation, NewMessage};
use mnemo_core::{MnemoError, StorageAdapter};
use mnemo_storage::SqliteStorage;
use mnemo_storage::database::now_timestamp;

/// A temp SQLite database, deleted when the harness is dropped.
pub struct TestHarness {
    storage: Arc<SqliteStorage>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create and migrate a fresh database.
    pub async fn new() -> Result<Self, MnemoError> {
        let temp_dir = tempfile::TempDir::new().map_err(MnemoError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::open(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        })
        .await?;

        Ok(Self {
            storage: Arc::new(storage),
            _temp_dir: temp_dir,
        })
    }

    pub fn storage(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }

    /// Insert a conversation owned by `user_id`.
    pub async fn create_conversation(
        &self,
        conversation_id: &str,
        user_id: i64,
    ) -> Result<Conversation, MnemoError> {
        let now = now_timestamp();
        let conversation = Conversation {
            conversation_id: conversation_id.to_string(),
            user_id,
            title: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.create_conversation(&conversation).await?;
        Ok(conversation)
    }

    /// Append a message and return its id.
    pub async fn add_message(
        &self,
        conversation: &Conversation,
        role: &str,
        content: &str,
    ) -> Result<i64, MnemoError> {
        self.storage
            .insert_message(&NewMessage {
                conversation_id: conversation.conversation_id.clone(),
                role: role.to_string(),
                content: content.to_string(),
                model_used: None,
            })
            .await
    }
}
