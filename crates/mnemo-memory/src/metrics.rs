// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these.
//! Without a recorder every call is a no-op.

use metrics::{describe_counter, describe_histogram};

/// Register all Mnemo metric descriptions.
///
/// Called once at startup after a recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "mnemo_embedding_cache_hits_total",
        "Embedding requests served from the cache"
    );
    describe_counter!(
        "mnemo_embedding_cache_misses_total",
        "Embedding requests that required computation"
    );
    describe_counter!(
        "mnemo_embedding_fallback_total",
        "Texts embedded with the hash fallback"
    );
    describe_counter!(
        "mnemo_rerank_fallback_total",
        "Rerank calls that fell back to upstream order"
    );
    describe_histogram!(
        "mnemo_retrieval_duration_seconds",
        "Wall time of get_relevant_context"
    );
}

pub fn record_cache_hits(count: u64) {
    metrics::counter!("mnemo_embedding_cache_hits_total").increment(count);
}

pub fn record_cache_misses(count: u64) {
    metrics::counter!("mnemo_embedding_cache_misses_total").increment(count);
}

pub fn record_embedding_fallback(count: u64) {
    metrics::counter!("mnemo_embedding_fallback_total").increment(count);
}

pub fn record_rerank_fallback(reranker: &'static str) {
    metrics::counter!("mnemo_rerank_fallback_total", "reranker" => reranker).increment(1);
}

pub fn record_retrieval_duration(seconds: f64) {
    metrics::histogram!("mnemo_retrieval_duration_seconds").record(seconds);
}
