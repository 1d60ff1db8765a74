// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `mnemo-core::types` for use across
//! adapter trait boundaries. This module re-exports them and holds the
//! row-mapping helpers shared by the query modules.

use rusqlite::types::Type;

pub use mnemo_core::types::{
    Conversation, ConversationVectorRecord, ConversationVectorUpsert, Message, NewMessage,
    VectorCounts,
};

/// Column list matching [`message_from_row`].
pub(crate) const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, model_used, \
     embedding, embedding_model, vector_id, created_at";

/// Column list matching [`conversation_vector_from_row`].
pub(crate) const VECTOR_COLUMNS: &str =
    "conversation_id, user_id, summary_embedding, key_entities, topics, created_at, updated_at";

pub(crate) fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        model_used: row.get(4)?,
        embedding: row.get(5)?,
        embedding_model: row.get(6)?,
        vector_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn conversation_vector_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<ConversationVectorRecord> {
    Ok(ConversationVectorRecord {
        conversation_id: row.get(0)?,
        user_id: row.get(1)?,
        summary_embedding: row.get(2)?,
        key_entities: json_list(row, 3)?,
        topics: json_list(row, 4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Decode a JSON array column into a list of strings.
fn json_list(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
