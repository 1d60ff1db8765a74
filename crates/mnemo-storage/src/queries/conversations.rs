// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use mnemo_core::MnemoError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::Conversation;

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        conversation_id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Insert a new conversation.
pub async fn create_conversation(db: &Database, conv: &Conversation) -> Result<(), MnemoError> {
    let conv = conv.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (conversation_id, user_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    conv.conversation_id,
                    conv.user_id,
                    conv.title,
                    conv.created_at,
                    conv.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by id.
pub async fn get_conversation(db: &Database, id: &str) -> Result<Option<Conversation>, MnemoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT conversation_id, user_id, title, created_at, updated_at
                 FROM conversations WHERE conversation_id = ?1",
                params![id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a user's conversations, most recently updated first.
pub async fn list_conversations_for_user(
    db: &Database,
    user_id: i64,
) -> Result<Vec<Conversation>, MnemoError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, user_id, title, created_at, updated_at
                 FROM conversations WHERE user_id = ?1
                 ORDER BY updated_at DESC, conversation_id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], conversation_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
