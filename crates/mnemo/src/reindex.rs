// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo reindex` command implementation.

use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_memory::{RecomputeReport, WriteOutcome};

use crate::app::App;

pub async fn run_reindex(
    config: &MnemoConfig,
    user_id: i64,
    conversation_id: Option<&str>,
) -> Result<(), MnemoError> {
    let app = App::open(config).await?;
    let reports = match conversation_id {
        Some(id) => vec![app.store().update_conversation_vectors(id, user_id).await?],
        None => app.store().rebuild_user_vectors(user_id).await?,
    };

    if reports.is_empty() {
        println!("user {user_id} has no conversations");
        return Ok(());
    }
    for report in &reports {
        println!("{}", report_line(report));
    }
    Ok(())
}

fn report_line(report: &RecomputeReport) -> String {
    let summary = match &report.summary {
        WriteOutcome::Persisted { vector_id } => format!("summary {vector_id}"),
        WriteOutcome::Unpersisted { reason } => format!("summary not written ({reason})"),
    };
    let mut line = format!(
        "{}: {} messages, {} backfilled",
        report.conversation_id, report.messages, report.backfilled
    );
    if report.backfill_failures > 0 {
        line.push_str(&format!(", {} failed", report.backfill_failures));
    }
    line.push_str(&format!(", {summary}"));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_line_mentions_failures_only_when_present() {
        let mut report = RecomputeReport {
            conversation_id: "c1".into(),
            messages: 4,
            backfilled: 2,
            backfill_failures: 0,
            summary: WriteOutcome::Persisted {
                vector_id: "conv_c1".into(),
            },
        };
        assert_eq!(report_line(&report), "c1: 4 messages, 2 backfilled, summary conv_c1");

        report.backfill_failures = 1;
        report.summary = WriteOutcome::Unpersisted {
            reason: "storage error".into(),
        };
        assert_eq!(
            report_line(&report),
            "c1: 4 messages, 2 backfilled, 1 failed, summary not written (storage error)"
        );
    }
}
