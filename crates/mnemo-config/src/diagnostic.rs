// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge for `mnemo.toml`.
//!
//! Unknown keys are checked against [`SECTION_KEYS`]: a typo gets a
//! "did you mean" from its own section, and a key written under the wrong
//! section (or at the top level) is pointed at the section that owns it.
//! Both unknown keys and type mismatches carry a span into the TOML source
//! when the offending file is known.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model::{section_keys, SECTION_KEYS};

/// Jaro-Winkler score a known key must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Source name used for configuration parsed from a string.
pub const INLINE_SOURCE: &str = "<inline>";

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key no section accepts at this position.
    #[error("unknown configuration key `{key}` in {}", scope_name(.section.as_deref()))]
    #[diagnostic(
        code(mnemo::config::unknown_key),
        help("{}", unknown_key_help(section.as_deref(), suggestion.as_deref(), home.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Section the key was written under; `None` at the top level.
        section: Option<String>,
        /// Closest valid key at this position.
        suggestion: Option<String>,
        /// Another section that accepts this exact key.
        home: Option<String>,
        /// Comma-separated keys valid at this position.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(mnemo::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the key, e.g. `retrieval.top_k`.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A post-parse validation failure.
    #[error("validation error: {message}")]
    #[diagnostic(code(mnemo::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(mnemo::config::other))]
    Other(String),
}

fn scope_name(section: Option<&str>) -> String {
    match section {
        Some(section) => format!("[{section}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(
    section: Option<&str>,
    suggestion: Option<&str>,
    home: Option<&str>,
    valid_keys: &str,
) -> String {
    let valid = match section {
        Some(section) => format!("keys in [{section}]: {valid_keys}"),
        None => format!("sections: {valid_keys}"),
    };
    match (suggestion, home) {
        (Some(s), _) => format!("did you mean `{s}`? Valid {valid}"),
        (None, Some(home)) => format!("this key belongs in the [{home}] section"),
        (None, None) => format!("valid {valid}"),
    }
}

/// Convert a `figment::Error` into one `ConfigError` per underlying error.
///
/// `toml_sources` pairs each loaded file path (or [`INLINE_SOURCE`]) with its
/// content and is only used to resolve spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    let source = source_for(error, toml_sources);
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let mut table: Vec<&str> = error.path.iter().map(String::as_str).collect();
            if table.last() == Some(&field.as_str()) {
                table.pop();
            }
            let section = table.first().copied();
            let valid: Vec<&str> = if !expected.is_empty() {
                expected.to_vec()
            } else if let Some(keys) = section.and_then(section_keys) {
                keys.to_vec()
            } else {
                SECTION_KEYS.iter().map(|(name, _)| *name).collect()
            };
            let suggestion = suggest_key(field, &valid);
            let home = match suggestion {
                Some(_) => None,
                None => owning_section(field, section),
            };
            let (span, src) = span_in(source, &table, field);
            ConfigError::UnknownKey {
                key: field.clone(),
                section: section.map(str::to_string),
                suggestion,
                home,
                valid_keys: valid.join(", "),
                span,
                src,
            }
        }
        Kind::InvalidType(actual, expected) => {
            let path: Vec<&str> = error.path.iter().map(String::as_str).collect();
            let (span, src) = match path.split_last() {
                Some((field, table)) => span_in(source, table, field),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

/// First section other than `current` that accepts `key` verbatim.
fn owning_section(key: &str, current: Option<&str>) -> Option<String> {
    SECTION_KEYS
        .iter()
        .find(|(name, keys)| Some(*name) != current && keys.contains(&key))
        .map(|(name, _)| name.to_string())
}

/// The loaded source the error's value came from. Environment overrides
/// have no file behind them and resolve to `None`.
fn source_for<'a>(
    error: &figment::Error,
    toml_sources: &'a [(String, String)],
) -> Option<&'a (String, String)> {
    let wanted = match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => path.display().to_string(),
        figment::Source::Code(_) => INLINE_SOURCE.to_string(),
        _ => return None,
    };
    toml_sources.iter().find(|(path, _)| *path == wanted)
}

fn span_in(
    source: Option<&(String, String)>,
    table: &[&str],
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((path, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, table, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field = ...` inside the TOML table at `table`.
///
/// An empty `table` means the top level, before any `[header]`. Headers are
/// compared after trimming, so `[ websearch . source_weights ]` matches
/// `["websearch", "source_weights"]`.
pub fn find_key_offset(content: &str, table: &[&str], field: &str) -> Option<usize> {
    let target = table.join(".");
    let mut current = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            if let Some(end) = header.find(']') {
                current = header[..end]
                    .split('.')
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join(".");
            }
        } else if current == target && assigns(trimmed, field) {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    None
}

fn assigns(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// Best Jaro-Winkler match for `unknown` among `valid_keys`.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
