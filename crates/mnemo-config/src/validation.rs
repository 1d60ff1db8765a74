// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as weight ranges, non-zero sizes, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::MnemoConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(validation("storage.database_path must not be empty"));
    }

    // Embedding provider
    let embedding = &config.embedding;
    if embedding.model_name.trim().is_empty() {
        errors.push(validation("embedding.model_name must not be empty"));
    }
    if embedding.cache_enabled && embedding.cache_size < 1 {
        errors.push(validation(
            "embedding.cache_size must be at least 1 when embedding.cache_enabled is true",
        ));
    }
    check_at_least_one(&mut errors, "embedding.batch_size", embedding.batch_size);
    check_at_least_one(&mut errors, "embedding.max_seq_length", embedding.max_seq_length);
    check_at_least_one(&mut errors, "embedding.intra_threads", embedding.intra_threads);
    if embedding.embedding_dim == Some(0) {
        errors.push(validation("embedding.embedding_dim must be at least 1 when set"));
    }

    // Conversation reranker
    let reranker = &config.reranker;
    if reranker.model_name.trim().is_empty() {
        errors.push(validation("reranker.model_name must not be empty"));
    }
    check_unit_range(&mut errors, "reranker.similarity_weight", reranker.similarity_weight);
    check_unit_range(&mut errors, "reranker.keyword_weight", reranker.keyword_weight);
    check_unit_range(&mut errors, "reranker.entity_bonus", reranker.entity_bonus);
    check_unit_range(&mut errors, "reranker.topic_bonus", reranker.topic_bonus);

    // Retrieval policy
    let retrieval = &config.retrieval;
    check_at_least_one(&mut errors, "retrieval.top_k", retrieval.top_k);
    check_at_least_one(&mut errors, "retrieval.overfetch_factor", retrieval.overfetch_factor);
    check_unit_range(
        &mut errors,
        "retrieval.similarity_threshold",
        retrieval.similarity_threshold,
    );

    // Web-search reranker
    let web = &config.websearch;
    check_at_least_one(&mut errors, "websearch.rerank_top_k", web.rerank_top_k);
    check_at_least_one(&mut errors, "websearch.max_content_length", web.max_content_length);
    check_unit_range(&mut errors, "websearch.title_weight", web.title_weight);
    check_unit_range(&mut errors, "websearch.content_weight", web.content_weight);
    check_unit_range(&mut errors, "websearch.min_relevance_score", web.min_relevance_score);
    check_unit_range(
        &mut errors,
        "websearch.domain_keyword_bonus",
        web.domain_keyword_bonus,
    );
    for (source, weight) in &web.source_weights {
        check_unit_range(
            &mut errors,
            &format!("websearch.source_weights.{source}"),
            *weight,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn check_unit_range(errors: &mut Vec<ConfigError>, key: &str, value: f32) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(validation(format!("{key} must be within [0, 1], got {value}")));
    }
}

fn check_at_least_one(errors: &mut Vec<ConfigError>, key: &str, value: usize) {
    if value < 1 {
        errors.push(validation(format!("{key} must be at least 1, got {value}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = MnemoConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = MnemoConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn weight_out_of_range_fails_validation() {
        let mut config = MnemoConfig::default();
        config.reranker.similarity_weight = 1.5;
        config.websearch.title_weight = -0.1;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "reranker.similarity_weight"));
        assert!(has_error(&errors, "websearch.title_weight"));
    }

    #[test]
    fn zero_cache_size_only_fails_when_caching() {
        let mut config = MnemoConfig::default();
        config.embedding.cache_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "embedding.cache_size"));

        config.embedding.cache_enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_all_errors_without_failing_fast() {
        let mut config = MnemoConfig::default();
        config.retrieval.top_k = 0;
        config.retrieval.overfetch_factor = 0;
        config.embedding.batch_size = 0;
        config.embedding.model_name = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn source_weight_out_of_range_names_the_source() {
        let mut config = MnemoConfig::default();
        config.websearch.source_weights.insert("forum".to_string(), 2.0);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "websearch.source_weights.forum"));
    }

    #[test]
    fn zero_embedding_dim_fails_validation() {
        let mut config = MnemoConfig::default();
        config.embedding.embedding_dim = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "embedding_dim"));
    }
}
