// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo stats` command implementation.
//!
//! Reports row counts from storage together with the embedding backend the
//! provider settled on. `--json` prints the same data for scripting.

use mnemo_config::MnemoConfig;
use mnemo_core::MnemoError;
use mnemo_memory::VectorStoreStats;

use crate::app::App;

pub async fn run_stats(config: &MnemoConfig, json: bool) -> Result<(), MnemoError> {
    let app = App::open(config).await?;
    let stats = app.store().stats().await?;

    if json {
        let rendered = serde_json::to_string_pretty(&stats)
            .map_err(|e| MnemoError::Internal(format!("failed to render stats: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", render(&stats));
    }
    Ok(())
}

fn render(stats: &VectorStoreStats) -> String {
    let backend = if stats.dense_active { "dense" } else { "hash fallback" };
    format!(
        "conversations:         {}\n\
         conversation vectors:  {}\n\
         messages:              {} ({} embedded)\n\
         embedding model:       {} ({} dims, {})\n",
        stats.conversations,
        stats.conversation_vectors,
        stats.messages,
        stats.embedded_messages,
        stats.model_name,
        stats.dimensions,
        backend
    )
}
