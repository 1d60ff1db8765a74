// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Mnemo configuration system.

use mnemo_config::diagnostic::{ConfigError, suggest_key};
use mnemo_config::model::{EmbeddingBackend, MnemoConfig, RerankStrategyKind};
use mnemo_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_mnemo_config() {
    let toml = r#"
[runtime]
log_level = "debug"
data_dir = "/var/lib/mnemo"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[embedding]
backend = "hash"
model_name = "bge-small-en-v1.5"
embedding_dim = 256
cache_size = 50

[reranker]
enabled = false
strategy = "auto"
similarity_weight = 0.6
keyword_weight = 0.4

[retrieval]
top_k = 5
similarity_threshold = 0.25
enforce_floor_when_reranked = true

[websearch]
rerank_top_k = 3
domain_keywords = ["catalyst", "polymer"]
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.runtime.log_level, "debug");
    assert_eq!(config.runtime.data_dir, "/var/lib/mnemo");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.embedding.backend, EmbeddingBackend::Hash);
    assert_eq!(config.embedding.model_name, "bge-small-en-v1.5");
    assert_eq!(config.embedding.embedding_dim, Some(256));
    assert_eq!(config.embedding.cache_size, 50);
    assert!(!config.reranker.enabled);
    assert_eq!(config.reranker.strategy, RerankStrategyKind::Auto);
    assert!((config.reranker.similarity_weight - 0.6).abs() < f32::EPSILON);
    assert_eq!(config.retrieval.top_k, 5);
    assert!(config.retrieval.enforce_floor_when_reranked);
    assert_eq!(config.websearch.rerank_top_k, 3);
    assert_eq!(config.websearch.domain_keywords, vec!["catalyst", "polymer"]);
}

/// Missing optional sections fall back to defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("[retrieval]\ntop_k = 7\n").unwrap();
    assert_eq!(config.retrieval.top_k, 7);
    assert_eq!(config.embedding.model_name, "all-MiniLM-L6-v2");
    assert!(config.reranker.enabled);
    assert!((config.retrieval.similarity_threshold - 0.3).abs() < f32::EPSILON);
}

/// Unknown field in [embedding] section produces an error.
#[test]
fn unknown_field_in_embedding_produces_error() {
    let toml = r#"
[embedding]
cach_size = 100
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("cach_size"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// MNEMO_EMBEDDING_CACHE_SIZE maps to embedding.cache_size, not embedding.cache.size.
#[test]
fn env_var_overrides_underscore_keys() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("mnemo.toml", "[embedding]\ncache_size = 10\n")?;
        jail.set_env("MNEMO_EMBEDDING_CACHE_SIZE", "123");
        jail.set_env("MNEMO_RETRIEVAL_TOP_K", "9");

        let config = mnemo_config::load_config_from_path(std::path::Path::new("mnemo.toml"))?;
        assert_eq!(config.embedding.cache_size, 123);
        assert_eq!(config.retrieval.top_k, 9);
        Ok(())
    });
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_file_uses_defaults() {
    let config = load_and_validate_path(std::path::Path::new("/nonexistent/path/mnemo.toml"))
        .expect("missing file should be silently skipped");
    assert_eq!(config.embedding.cache_size, 10_000);
}

#[test]
fn diagnostic_suggests_cache_size() {
    let suggestion = suggest_key("cach_size", &["cache_size", "cache_enabled", "batch_size"]);
    assert_eq!(suggestion.as_deref(), Some("cache_size"));
}

/// Error output from load_and_validate_str includes the unknown key and a suggestion.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[retrieval]
similarity_treshold = 0.4
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "similarity_treshold"
                && suggestion.as_deref() == Some("similarity_threshold")
                && valid_keys.contains("overfetch_factor")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error with suggestion, got: {errors:?}"
    );
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[retrieval]
top_k = "three"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("top_k"))),
        "got: {errors:?}"
    );
}

/// Type mismatches in inline TOML point at the offending key.
#[test]
fn invalid_type_carries_source_span() {
    let toml = "[embedding]\ncache_size = 1\n[retrieval]\ntop_k = \"three\"\n";

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    let span = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::InvalidType { span, .. } => *span,
            _ => None,
        })
        .expect("invalid type should carry a span");
    assert_eq!(&toml[span.offset()..span.offset() + span.len()], "top_k");
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "topk".to_string(),
        section: Some("retrieval".to_string()),
        suggestion: Some("top_k".to_string()),
        home: None,
        valid_keys: "top_k, similarity_threshold".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `top_k`"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("topk"), "rendered report should mention the key");
}

/// Validation runs after a successful parse.
#[test]
fn validation_catches_out_of_range_weight() {
    let toml = r#"
[websearch]
content_weight = 1.2
"#;

    let errors = load_and_validate_str(toml).expect_err("weight above 1 should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("websearch.content_weight"))
    }));
}

/// Defaults survive a serialize/parse cycle, which the `config` command relies on.
#[test]
fn default_config_renders_as_toml() {
    let rendered = toml::to_string(&MnemoConfig::default()).expect("should serialize");
    assert!(rendered.contains("[retrieval]"));
    let config = load_and_validate_str(&rendered).expect("rendered defaults should validate");
    assert_eq!(config.websearch.source_weights.len(), 2);
}
