//! Scheduled snapshot runner: aggregates once (or every `SNAPSHOT_INTERVAL_SECS`)
//! and writes `news_YYYYmmdd_HHMMSS.json` into `SNAPSHOT_DIR`.

use std::path::PathBuf;
use std::sync::Arc;

use ai_trends_aggregator::ingest::scheduler::{
    snapshot_once, spawn_snapshot_scheduler, SnapshotSchedulerCfg,
};
use ai_trends_aggregator::{api::clamp_limit, build_state_from_config, TimeRange};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let range: TimeRange = env_or("SNAPSHOT_RANGE", "daily").parse()?;
    let limit = clamp_limit(Some(
        env_or("SNAPSHOT_LIMIT", "30")
            .parse()
            .context("SNAPSHOT_LIMIT must be a non-negative integer")?,
    ));
    let out_dir = PathBuf::from(env_or("SNAPSHOT_DIR", "snapshots"));
    let interval_secs: Option<u64> = std::env::var("SNAPSHOT_INTERVAL_SECS")
        .ok()
        .map(|s| s.parse())
        .transpose()
        .context("SNAPSHOT_INTERVAL_SECS must be an integer")?;

    let state = build_state_from_config()?;

    match interval_secs {
        None => {
            match snapshot_once(&state.aggregator, range, limit, &out_dir).await? {
                Some(path) => println!("snapshot written to {}", path.display()),
                None => println!("no items fetched; nothing written"),
            }
        }
        Some(secs) => {
            let handle = spawn_snapshot_scheduler(
                Arc::clone(&state.aggregator),
                SnapshotSchedulerCfg {
                    interval_secs: secs,
                    range,
                    limit,
                    out_dir,
                },
            );
            tokio::select! {
                res = handle => res.context("snapshot scheduler stopped")?,
                _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
            }
        }
    }
    Ok(())
}
