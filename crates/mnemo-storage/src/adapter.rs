// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use mnemo_config::model::StorageConfig;
use mnemo_core::types::{
    Conversation, ConversationVectorRecord, ConversationVectorUpsert, Message, NewMessage,
    VectorCounts,
};
use mnemo_core::{AdapterType, HealthStatus, MnemoError, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the configured database immediately.
    pub async fn open(config: StorageConfig) -> Result<Self, MnemoError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, MnemoError> {
        self.db.get().ok_or_else(|| MnemoError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), MnemoError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!(path = %self.config.database_path, "WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        // Shutdown delegates to a checkpoint if the DB was initialized.
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), MnemoError> {
        let db = Database::open_with_options(&self.config.database_path, self.config.wal_mode)
            .await?;
        self.db.set(db).map_err(|_| MnemoError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), MnemoError> {
        let db = self.db()?;
        self.checkpoint(db).await
    }

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), MnemoError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, MnemoError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn list_conversations(&self, user_id: i64) -> Result<Vec<Conversation>, MnemoError> {
        queries::conversations::list_conversations_for_user(self.db()?, user_id).await
    }

    // --- Message operations ---

    async fn insert_message(&self, message: &NewMessage) -> Result<i64, MnemoError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_message(&self, id: i64) -> Result<Option<Message>, MnemoError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, MnemoError> {
        queries::messages::get_messages_for_conversation(self.db()?, conversation_id).await
    }

    async fn set_message_embedding(
        &self,
        message_id: i64,
        embedding: &[f32],
        model: &str,
        vector_id: &str,
    ) -> Result<bool, MnemoError> {
        queries::messages::set_message_embedding(self.db()?, message_id, embedding, model, vector_id)
            .await
    }

    // --- Conversation vector operations ---

    async fn upsert_conversation_vector(
        &self,
        record: &ConversationVectorUpsert,
    ) -> Result<(), MnemoError> {
        queries::vectors::upsert_conversation_vector(self.db()?, record).await
    }

    async fn get_conversation_vector(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationVectorRecord>, MnemoError> {
        queries::vectors::get_conversation_vector(self.db()?, conversation_id).await
    }

    async fn list_conversation_vectors(
        &self,
        user_id: i64,
        exclude_conversation_id: Option<&str>,
    ) -> Result<Vec<ConversationVectorRecord>, MnemoError> {
        queries::vectors::list_conversation_vectors_for_user(
            self.db()?,
            user_id,
            exclude_conversation_id,
        )
        .await
    }

    async fn count_vectors(&self) -> Result<VectorCounts, MnemoError> {
        let db = self.db()?;
        let (conversations, conversation_vectors) =
            queries::vectors::count_conversation_vectors(db).await?;
        let (messages, embedded_messages) = queries::messages::count_messages(db).await?;
        Ok(VectorCounts {
            conversations,
            conversation_vectors,
            messages,
            embedded_messages,
        })
    }
}
