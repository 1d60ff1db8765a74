// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation summary vector operations.
//!
//! At most one row exists per conversation; writes are upserts.

use mnemo_core::{MnemoError, vec_to_blob};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, now_timestamp};
use crate::models::{
    ConversationVectorRecord, ConversationVectorUpsert, VECTOR_COLUMNS,
    conversation_vector_from_row,
};

/// Create the vector row for a conversation, or overwrite it and bump `updated_at`.
pub async fn upsert_conversation_vector(
    db: &Database,
    record: &ConversationVectorUpsert,
) -> Result<(), MnemoError> {
    let entities = serde_json::to_string(&record.key_entities).map_err(MnemoError::storage)?;
    let topics = serde_json::to_string(&record.topics).map_err(MnemoError::storage)?;
    let blob = vec_to_blob(&record.summary_embedding);
    let conversation_id = record.conversation_id.clone();
    let user_id = record.user_id;
    let now = now_timestamp();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation_vectors
                     (conversation_id, user_id, summary_embedding, key_entities, topics,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT (conversation_id) DO UPDATE SET
                     user_id = excluded.user_id,
                     summary_embedding = excluded.summary_embedding,
                     key_entities = excluded.key_entities,
                     topics = excluded.topics,
                     updated_at = excluded.updated_at",
                params![conversation_id, user_id, blob, entities, topics, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the vector row for one conversation.
pub async fn get_conversation_vector(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<ConversationVectorRecord>, MnemoError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {VECTOR_COLUMNS} FROM conversation_vectors WHERE conversation_id = ?1"
                ),
                params![conversation_id],
                conversation_vector_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a user's vector rows, optionally excluding one conversation.
pub async fn list_conversation_vectors_for_user(
    db: &Database,
    user_id: i64,
    exclude_conversation_id: Option<&str>,
) -> Result<Vec<ConversationVectorRecord>, MnemoError> {
    let exclude = exclude_conversation_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VECTOR_COLUMNS} FROM conversation_vectors
                 WHERE user_id = ?1 AND (?2 IS NULL OR conversation_id != ?2)
                 ORDER BY updated_at DESC, conversation_id ASC"
            ))?;
            let rows = stmt.query_map(params![user_id, exclude], conversation_vector_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count conversations and conversation vector rows.
pub async fn count_conversation_vectors(db: &Database) -> Result<(u64, u64), MnemoError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT (SELECT COUNT(*) FROM conversations),
                        (SELECT COUNT(*) FROM conversation_vectors)",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conversation;
    use crate::queries::conversations::create_conversation;
    use mnemo_core::blob_to_vec;
    use tempfile::tempdir;

    async fn setup_db(conversations: &[(&str, i64)]) -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        for (id, user_id) in conversations {
            let conv = Conversation {
                conversation_id: id.to_string(),
                user_id: *user_id,
                title: None,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            };
            create_conversation(&db, &conv).await.unwrap();
        }
        (db, dir)
    }

    fn upsert(id: &str, user_id: i64, embedding: Vec<f32>, topics: &[&str]) -> ConversationVectorUpsert {
        ConversationVectorUpsert {
            conversation_id: id.to_string(),
            user_id,
            summary_embedding: embedding,
            key_entities: vec!["Aspirin".to_string()],
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_overwrites_single_row() {
        let (db, _dir) = setup_db(&[("c1", 1)]).await;

        upsert_conversation_vector(&db, &upsert("c1", 1, vec![1.0, 0.0], &["history"]))
            .await
            .unwrap();
        let first = get_conversation_vector(&db, "c1").await.unwrap().unwrap();
        assert_eq!(first.topics, vec!["history"]);
        assert_eq!(first.key_entities, vec!["Aspirin"]);

        upsert_conversation_vector(&db, &upsert("c1", 1, vec![0.0, 1.0], &["dosage"]))
            .await
            .unwrap();
        let second = get_conversation_vector(&db, "c1").await.unwrap().unwrap();
        assert_eq!(second.topics, vec!["dosage"]);
        assert_eq!(
            blob_to_vec(second.summary_embedding.as_deref().unwrap()),
            Some(vec![0.0, 1.0])
        );
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at >= first.updated_at);

        let (_, vectors) = count_conversation_vectors(&db).await.unwrap();
        assert_eq!(vectors, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_for_unknown_conversation_fails() {
        let (db, _dir) = setup_db(&[]).await;
        let result = upsert_conversation_vector(&db, &upsert("ghost", 1, vec![1.0], &[])).await;
        assert!(result.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_user_and_exclusion() {
        let (db, _dir) = setup_db(&[("a", 1), ("b", 1), ("c", 2)]).await;
        for (id, user) in [("a", 1), ("b", 1), ("c", 2)] {
            upsert_conversation_vector(&db, &upsert(id, user, vec![1.0], &[]))
                .await
                .unwrap();
        }

        let all = list_conversation_vectors_for_user(&db, 1, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let excluded = list_conversation_vectors_for_user(&db, 1, Some("a"))
            .await
            .unwrap();
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].conversation_id, "b");

        let none = list_conversation_vectors_for_user(&db, 3, None).await.unwrap();
        assert!(none.is_empty());
        db.close().await.unwrap();
    }
}
