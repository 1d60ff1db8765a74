// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemo memory subsystem.
//!
//! This crate provides the foundational trait definitions, error types, and
//! record types used throughout the Mnemo workspace. Every collaborator
//! (storage, embedder, rerank model, extractor) implements traits defined here.

pub mod codec;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use codec::{blob_to_vec, cosine_similarity, vec_to_blob};
pub use error::MnemoError;
pub use types::{AdapterType, HealthStatus};

// Re-export all adapter traits at crate root.
pub use traits::{EmbeddingAdapter, EntityExtractor, PluginAdapter, RerankAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemo_error_displays_context() {
        let err = MnemoError::ModelUnavailable {
            model: "all-MiniLM-L6-v2".into(),
            reason: "model.onnx missing".into(),
        };
        assert_eq!(
            err.to_string(),
            "model unavailable: all-MiniLM-L6-v2: model.onnx missing"
        );

        let err = MnemoError::storage(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "storage error: disk full");

        let err = MnemoError::AdapterNotFound {
            adapter_type: "Reranker".into(),
            name: "bge".into(),
        };
        assert_eq!(err.to_string(), "adapter not found: Reranker/bge");
    }

    #[test]
    fn adapter_type_display_and_parse() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Storage,
            AdapterType::Embedding,
            AdapterType::Reranker,
            AdapterType::Extractor,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn adapter_type_serialization() {
        let json = serde_json::to_string(&AdapterType::Reranker).expect("should serialize");
        assert_eq!(json, "\"Reranker\"");
        let parsed: AdapterType = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, AdapterType::Reranker);
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("hash fallback".into());
        assert_ne!(degraded, healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }

    #[test]
    fn conversation_turn_from_message() {
        let message = types::Message {
            id: 7,
            conversation_id: "c1".into(),
            role: "user".into(),
            content: "hello".into(),
            model_used: None,
            embedding: None,
            embedding_model: None,
            vector_id: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let turn = types::ConversationTurn::from(&message);
        assert_eq!(turn, types::ConversationTurn::new("user", "hello"));
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_rerank_adapter<T: RerankAdapter>() {}
        fn _assert_entity_extractor<T: EntityExtractor>() {}
    }
}
