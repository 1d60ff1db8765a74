// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo search` command implementation.

use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_memory::{RelevantContext, RerankMode, RetrievalStatus};

use crate::app::App;

#[derive(Debug, Clone)]
pub struct SearchArgs {
    pub user_id: i64,
    pub query: String,
    pub exclude: Option<String>,
    pub top_k: Option<usize>,
    pub rerank: bool,
    pub json: bool,
}

pub async fn run_search(config: &MnemoConfig, args: &SearchArgs) -> Result<(), MnemoError> {
    let app = App::open(config).await?;
    let assembler = app.assembler(args.rerank).await;
    let context = assembler
        .get_relevant_context(
            args.user_id,
            &args.query,
            args.exclude.as_deref(),
            args.top_k,
            &[],
        )
        .await;

    if args.json {
        let rendered = serde_json::to_string_pretty(&context)
            .map_err(|e| MnemoError::Internal(format!("failed to render result: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", render(&context));
    }
    Ok(())
}

fn mode_label(status: &RetrievalStatus) -> String {
    match status.rerank_mode() {
        None => "similarity".to_string(),
        Some(RerankMode::Heuristic) => "heuristic".to_string(),
        Some(RerankMode::CrossEncoder) => "cross-encoder".to_string(),
        Some(RerankMode::Fallback { reason }) => format!("similarity (rerank failed: {reason})"),
    }
}

/// Plain-text listing of a retrieval result.
fn render(context: &RelevantContext) -> String {
    match &context.status {
        RetrievalStatus::Empty => return "No conversation history found\n".to_string(),
        RetrievalStatus::Degraded { reason } => {
            return format!("Search unavailable: {reason}\n");
        }
        RetrievalStatus::Ranked { .. } => {}
    }
    if context.entries.is_empty() {
        return "No relevant past conversations found\n".to_string();
    }

    let mut out = format!("Ranked by {}\n\n", mode_label(&context.status));
    for (i, entry) in context.entries.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}  relevance {:.3}  similarity {:.3}\n",
            i + 1,
            entry.conversation_id,
            entry.relevance_score,
            entry.similarity
        ));
        out.push_str(&format!("   {}\n", entry.content_digest));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_memory::ContextEntry;

    fn entry(id: &str, relevance: f32, similarity: f32) -> ContextEntry {
        ContextEntry {
            conversation_id: id.to_string(),
            similarity,
            relevance_score: relevance,
            topics: vec!["polymer".into()],
            entities: Vec::new(),
            content_digest: "Topics: polymer".into(),
        }
    }

    #[test]
    fn renders_ranked_entries() {
        let context = RelevantContext {
            entries: vec![entry("b", 0.71, 0.2), entry("a", 0.4, 0.35)],
            status: RetrievalStatus::Ranked {
                mode: Some(RerankMode::Heuristic),
            },
        };
        let text = render(&context);
        assert!(text.starts_with("Ranked by heuristic\n"));
        assert!(text.contains("1. b  relevance 0.710  similarity 0.200"));
        assert!(text.contains("2. a  relevance 0.400  similarity 0.350"));
        assert!(text.contains("   Topics: polymer"));
    }

    #[test]
    fn renders_empty_and_degraded() {
        assert_eq!(render(&RelevantContext::empty()), "No conversation history found\n");
        assert_eq!(
            render(&RelevantContext::degraded("disk full")),
            "Search unavailable: disk full\n"
        );
        let filtered = RelevantContext {
            entries: Vec::new(),
            status: RetrievalStatus::Ranked { mode: None },
        };
        assert_eq!(render(&filtered), "No relevant past conversations found\n");
    }

    #[test]
    fn fallback_mode_is_labelled() {
        let status = RetrievalStatus::Ranked {
            mode: Some(RerankMode::Fallback {
                reason: "model crashed".into(),
            }),
        };
        assert_eq!(mode_label(&status), "similarity (rerank failed: model crashed)");
    }
}
