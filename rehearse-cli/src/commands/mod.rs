pub mod advise;
pub mod config;
pub mod practice;
pub mod sessions;

use anyhow::{Context, Result};
use rehearse_core::{JsonFileStore, SessionSummary};

use crate::config::RehearseConfig;

/// Open the session store configured under `[storage]`
pub(crate) async fn open_store(config: &RehearseConfig) -> Result<JsonFileStore> {
    let dir = &config.storage.data_dir;
    JsonFileStore::open(dir)
        .await
        .with_context(|| format!("Failed to open session store at {}", dir.display()))
}

/// One-line rendering of a completed session
pub(crate) fn format_summary(summary: &SessionSummary) -> String {
    format!(
        "{}  score {:>3}  points {:>4}  exchanges {:>2}  level {:.1}  {}",
        summary.completed_at.format("%Y-%m-%d %H:%M"),
        summary.score,
        summary.points,
        summary.exchange_count,
        summary.difficulty_level,
        summary.scenario
    )
}
