// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations, including the per-message embedding columns.

use mnemo_core::{MnemoError, vec_to_blob};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, now_timestamp};
use crate::models::{MESSAGE_COLUMNS, Message, NewMessage, message_from_row};

/// Insert a new message and bump the owning conversation's `updated_at`.
///
/// Returns the id assigned to the message.
pub async fn insert_message(db: &Database, msg: &NewMessage) -> Result<i64, MnemoError> {
    let msg = msg.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (conversation_id, role, content, model_used, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![msg.conversation_id, msg.role, msg.content, msg.model_used, now],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE conversation_id = ?2",
                params![now, msg.conversation_id],
            )?;
            tx.commit()?;
            Ok(id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a single message by id.
pub async fn get_message(db: &Database, id: i64) -> Result<Option<Message>, MnemoError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                message_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get messages for a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Write the embedding columns of a message.
///
/// Returns `false` when no message with `id` exists.
pub async fn set_message_embedding(
    db: &Database,
    id: i64,
    embedding: &[f32],
    model: &str,
    vector_id: &str,
) -> Result<bool, MnemoError> {
    let blob = vec_to_blob(embedding);
    let model = model.to_string();
    let vector_id = vector_id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE messages SET embedding = ?1, embedding_model = ?2, vector_id = ?3
                 WHERE id = ?4",
                params![blob, model, vector_id, id],
            )?;
            Ok(updated > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count all messages and those carrying an embedding.
pub async fn count_messages(db: &Database) -> Result<(u64, u64), MnemoError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT COUNT(*), COUNT(embedding) FROM messages",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
