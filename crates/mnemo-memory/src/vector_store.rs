// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message and conversation vectors on top of a [`StorageAdapter`].
//!
//! Writes are best effort and report a [`WriteOutcome`] instead of failing.
//! Similarity search is brute force over an explicit candidate set.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mnemo_core::error::MnemoError;
use mnemo_core::traits::{EntityExtractor, StorageAdapter};
use mnemo_core::types::{ConversationVectorRecord, ConversationVectorUpsert};
use mnemo_core::{blob_to_vec, cosine_similarity};

use crate::embedding::EmbeddingProvider;
use crate::types::{RecomputeReport, VectorStoreStats, WriteOutcome};

pub struct VectorStore {
    storage: Arc<dyn StorageAdapter>,
    embeddings: Arc<EmbeddingProvider>,
    extractor: Arc<dyn EntityExtractor>,
}

impl VectorStore {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embeddings: Arc<EmbeddingProvider>,
        extractor: Arc<dyn EntityExtractor>,
    ) -> Self {
        Self {
            storage,
            embeddings,
            extractor,
        }
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingProvider> {
        &self.embeddings
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Embed `content` and attach the vector to message `message_id`.
    pub async fn store_message_embedding(&self, message_id: i64, content: &str) -> WriteOutcome {
        let encoded = self.embeddings.encode_tagged(content).await;
        let vector_id = Uuid::new_v4().to_string();
        self.write_message_vector(message_id, &encoded.vector, &encoded.model, vector_id)
            .await
    }

    async fn write_message_vector(
        &self,
        message_id: i64,
        vector: &[f32],
        model: &str,
        vector_id: String,
    ) -> WriteOutcome {
        match self
            .storage
            .set_message_embedding(message_id, vector, model, &vector_id)
            .await
        {
            Ok(true) => {
                debug!(message_id, vector_id = %vector_id, model, "message embedding stored");
                WriteOutcome::Persisted { vector_id }
            }
            Ok(false) => {
                warn!(message_id, "message not found, embedding not stored");
                WriteOutcome::Unpersisted {
                    reason: format!("message {message_id} not found"),
                }
            }
            Err(e) => {
                warn!(message_id, error = %e, "failed to store message embedding");
                WriteOutcome::Unpersisted {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Index a freshly persisted message without waiting for the result.
    pub fn index_message_in_background(
        self: &Arc<Self>,
        message_id: i64,
        content: String,
    ) -> JoinHandle<WriteOutcome> {
        let store = Arc::clone(self);
        tokio::spawn(async move { store.store_message_embedding(message_id, &content).await })
    }

    /// Create or refresh a conversation's summary vector.
    pub async fn store_conversation_summary(
        &self,
        conversation_id: &str,
        user_id: i64,
        summary: &str,
        key_entities: &[String],
        topics: &[String],
    ) -> WriteOutcome {
        let summary_embedding = self.embeddings.encode(summary).await;
        let record = ConversationVectorUpsert {
            conversation_id: conversation_id.to_string(),
            user_id,
            summary_embedding,
            key_entities: key_entities.to_vec(),
            topics: topics.to_vec(),
        };

        match self.storage.upsert_conversation_vector(&record).await {
            Ok(()) => {
                debug!(conversation_id, user_id, "conversation summary stored");
                WriteOutcome::Persisted {
                    vector_id: format!("conv_{conversation_id}"),
                }
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "failed to store conversation summary");
                WriteOutcome::Unpersisted {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// A user's conversation vectors, optionally without one conversation.
    pub async fn load_candidates(
        &self,
        user_id: i64,
        exclude_conversation_id: Option<&str>,
    ) -> Result<Vec<ConversationVectorRecord>, MnemoError> {
        self.storage
            .list_conversation_vectors(user_id, exclude_conversation_id)
            .await
    }

    /// Rank `candidates` by cosine similarity of their summary to `query`.
    ///
    /// Candidates with a missing, malformed or differently sized vector are
    /// skipped. Returns at most `top_k` pairs, most similar first.
    pub async fn similarity_search(
        &self,
        query: &str,
        candidates: &[ConversationVectorRecord],
        top_k: usize,
    ) -> Vec<(ConversationVectorRecord, f32)> {
        if candidates.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let query_embedding = self.embeddings.encode(query).await;

        let mut scored: Vec<(ConversationVectorRecord, f32)> = candidates
            .iter()
            .filter_map(|candidate| {
                let blob = candidate.summary_embedding.as_deref()?;
                let Some(vector) = blob_to_vec(blob) else {
                    debug!(conversation_id = %candidate.conversation_id, "skipping malformed vector");
                    return None;
                };
                if vector.len() != query_embedding.len() {
                    debug!(
                        conversation_id = %candidate.conversation_id,
                        stored = vector.len(),
                        expected = query_embedding.len(),
                        "skipping vector with different dimension"
                    );
                    return None;
                }
                Some((candidate.clone(), cosine_similarity(&query_embedding, &vector)))
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored
    }

    /// Recompute a conversation's summary vector and backfill message embeddings.
    pub async fn update_conversation_vectors(
        &self,
        conversation_id: &str,
        user_id: i64,
    ) -> Result<RecomputeReport, MnemoError> {
        let messages = self.storage.get_messages(conversation_id).await?;
        if messages.is_empty() {
            return Ok(RecomputeReport {
                conversation_id: conversation_id.to_string(),
                messages: 0,
                backfilled: 0,
                backfill_failures: 0,
                summary: WriteOutcome::Unpersisted {
                    reason: "conversation has no messages".to_string(),
                },
            });
        }

        let digest = self.extractor.extract(&messages).await?;
        let summary = self
            .store_conversation_summary(
                conversation_id,
                user_id,
                &digest.summary,
                &digest.key_entities,
                &digest.topics,
            )
            .await;

        let missing: Vec<_> = messages.iter().filter(|m| m.embedding.is_none()).collect();
        let texts: Vec<String> = missing.iter().map(|m| m.content.clone()).collect();
        let encoded = self.embeddings.encode_batch_tagged(&texts).await;

        let mut backfilled = 0;
        let mut backfill_failures = 0;
        for (message, vector) in missing.iter().zip(encoded) {
            let outcome = self
                .write_message_vector(
                    message.id,
                    &vector.vector,
                    &vector.model,
                    Uuid::new_v4().to_string(),
                )
                .await;
            if outcome.is_persisted() {
                backfilled += 1;
            } else {
                backfill_failures += 1;
            }
        }

        info!(
            conversation_id,
            messages = messages.len(),
            backfilled,
            backfill_failures,
            "conversation vectors updated"
        );
        Ok(RecomputeReport {
            conversation_id: conversation_id.to_string(),
            messages: messages.len(),
            backfilled,
            backfill_failures,
            summary,
        })
    }

    /// Recompute vectors for every conversation of `user_id`.
    ///
    /// A conversation that fails is reported with an unpersisted summary
    /// carrying the error, and the rebuild moves on to the next one. Only a
    /// failure to list the user's conversations is returned as `Err`.
    pub async fn rebuild_user_vectors(&self, user_id: i64) -> Result<Vec<RecomputeReport>, MnemoError> {
        let conversations = self.storage.list_conversations(user_id).await?;
        let mut reports = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let id = conversation.conversation_id;
            match self.update_conversation_vectors(&id, user_id).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(conversation_id = %id, error = %e, "conversation rebuild failed");
                    reports.push(RecomputeReport {
                        conversation_id: id,
                        messages: 0,
                        backfilled: 0,
                        backfill_failures: 0,
                        summary: WriteOutcome::Unpersisted {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }
        Ok(reports)
    }

    pub async fn stats(&self) -> Result<VectorStoreStats, MnemoError> {
        let counts = self.storage.count_vectors().await?;
        Ok(VectorStoreStats {
            conversations: counts.conversations,
            conversation_vectors: counts.conversation_vectors,
            messages: counts.messages,
            embedded_messages: counts.embedded_messages,
            model_name: self.embeddings.model_name().to_string(),
            dimensions: self.embeddings.dimensions(),
            dense_active: self.embeddings.is_dense(),
        })
    }
}
