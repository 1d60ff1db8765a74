// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frequency-based summary, topic and entity extraction.
//!
//! Carries no domain lexicon. Topics are the most frequent content words;
//! entities are capitalized or mixed alphanumeric tokens that do not merely
//! start a sentence (`Aspirin`, `H2SO4`, `BASF`).

use std::collections::HashMap;

use async_trait::async_trait;

use mnemo_core::error::MnemoError;
use mnemo_core::traits::EntityExtractor;
use mnemo_core::traits::adapter::PluginAdapter;
use mnemo_core::types::{AdapterType, ConversationDigest, HealthStatus, Message};

/// Common English function words ignored as topics and entities.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "been", "before", "being", "between", "both", "could",
    "does", "doing", "each", "from", "have", "having", "here", "into", "just", "know", "like",
    "make", "more", "most", "much", "only", "other", "over", "please", "same", "should", "some",
    "such", "tell", "than", "that", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "very", "want", "were", "what", "when", "where", "which", "while", "will",
    "with", "would", "your", "yours",
];

const MIN_TOPIC_LEN: usize = 4;

/// Limits for [`KeywordExtractor`].
#[derive(Debug, Clone)]
pub struct KeywordExtractorOptions {
    pub max_topics: usize,
    pub max_entities: usize,
    pub summary_chars: usize,
}

impl Default for KeywordExtractorOptions {
    fn default() -> Self {
        Self {
            max_topics: 5,
            max_entities: 10,
            summary_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordExtractor {
    options: KeywordExtractorOptions,
}

impl KeywordExtractor {
    pub fn new(options: KeywordExtractorOptions) -> Self {
        Self { options }
    }

    pub fn digest(&self, messages: &[Message]) -> ConversationDigest {
        ConversationDigest {
            summary: summarize(messages, self.options.summary_chars),
            key_entities: entities(messages, self.options.max_entities),
            topics: topics(messages, self.options.max_topics),
        }
    }
}

/// Message contents joined in order and cut at `max_chars` characters.
fn summarize(messages: &[Message], max_chars: usize) -> String {
    let joined = messages
        .iter()
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    joined.chars().take(max_chars).collect()
}

fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Rank keys by count descending, then by first appearance.
fn ranked(counts: HashMap<String, (usize, usize)>, limit: usize) -> Vec<String> {
    let mut items: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    items.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)));
    items.into_iter().take(limit).map(|(k, _)| k).collect()
}

fn topics(messages: &[Message], limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut position = 0usize;
    for message in messages {
        for token in message.content.split(|c: char| !c.is_alphanumeric()) {
            let word = token.to_lowercase();
            if word.chars().count() < MIN_TOPIC_LEN
                || is_stopword(&word)
                || word.chars().all(|c| c.is_ascii_digit())
            {
                continue;
            }
            let entry = counts.entry(word).or_insert((0, position));
            entry.0 += 1;
            position += 1;
        }
    }
    ranked(counts, limit)
}

fn entities(messages: &[Message], limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut position = 0usize;
    for message in messages {
        let mut sentence_start = true;
        for raw in message.content.split_whitespace() {
            let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
            let ends_sentence = raw.ends_with(['.', '!', '?']);
            if !token.is_empty() && is_entity(token, sentence_start) {
                let entry = counts.entry(token.to_string()).or_insert((0, position));
                entry.0 += 1;
                position += 1;
            }
            sentence_start = ends_sentence;
        }
    }
    ranked(counts, limit)
}

fn is_entity(token: &str, sentence_start: bool) -> bool {
    if token.chars().count() < 2 || is_stopword(&token.to_lowercase()) {
        return false;
    }
    let mut chars = token.chars();
    let first_upper = chars.next().is_some_and(char::is_uppercase);
    let rest_marked = chars.any(|c| c.is_uppercase() || c.is_ascii_digit());
    let has_alpha = token.chars().any(char::is_alphabetic);
    let has_digit = token.chars().any(|c| c.is_ascii_digit());

    has_alpha && ((first_upper && !sentence_start) || (rest_marked && (first_upper || has_digit)))
}

#[async_trait]
impl PluginAdapter for KeywordExtractor {
    fn name(&self) -> &str {
        "keyword-extractor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EntityExtractor for KeywordExtractor {
    async fn extract(&self, messages: &[Message]) -> Result<ConversationDigest, MnemoError> {
        Ok(self.digest(messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str) -> Message {
        Message {
            id: 1,
            conversation_id: "c1".to_string(),
            role: "user".to_string(),
            content: content.to_string(),
            model_used: None,
            embedding: None,
            embedding_model: None,
            vector_id: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn stopwords_are_sorted() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn topics_rank_by_frequency_then_first_use() {
        let messages = vec![
            message("polymer catalysis with metallocene catalysts"),
            message("Catalysis again: polymer chains grow"),
        ];
        let topics = topics(&messages, 3);
        assert_eq!(topics, vec!["polymer", "catalysis", "metallocene"]);
    }

    #[test]
    fn entities_skip_sentence_initial_words() {
        let messages = vec![message(
            "Tell me about Aspirin. Dosage of Aspirin and H2SO4 handling at BASF.",
        )];
        let entities = entities(&messages, 10);
        assert_eq!(entities, vec!["Aspirin", "H2SO4", "BASF"]);
    }

    #[test]
    fn summary_is_truncated() {
        let messages = vec![message("  first  "), message(""), message("second message")];
        assert_eq!(summarize(&messages, 100), "first second message");
        assert_eq!(summarize(&messages, 5), "first");
    }

    #[tokio::test]
    async fn extract_produces_digest() {
        let extractor = KeywordExtractor::default();
        let digest = extractor
            .extract(&[message("We compared Ziegler catalysts for polymer synthesis")])
            .await
            .unwrap();
        assert_eq!(digest.key_entities, vec!["Ziegler"]);
        assert!(digest.topics.contains(&"polymer".to_string()));
        assert!(digest.summary.starts_with("We compared"));
    }

    #[tokio::test]
    async fn empty_history_yields_empty_digest() {
        let digest = KeywordExtractor::default().extract(&[]).await.unwrap();
        assert_eq!(digest, ConversationDigest::default());
    }
}
