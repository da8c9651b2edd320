// src/ingest/scheduler.rs
//! Periodic aggregation with on-disk JSON snapshots.
//!
//! The core never persists anything; this is the calling layer that does.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::task::JoinHandle;

use crate::ingest::Aggregator;
use crate::model::TimeRange;
use crate::report::{FailureResponse, NewsResponse};

#[derive(Clone, Debug)]
pub struct SnapshotSchedulerCfg {
    pub interval_secs: u64,
    pub range: TimeRange,
    pub limit: usize,
    pub out_dir: PathBuf,
}

pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
    format!("news_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Run one aggregation and write it to `out_dir`. Returns the written path,
/// or `None` when the run produced no items (nothing is written then).
pub async fn snapshot_once(
    aggregator: &Aggregator,
    range: TimeRange,
    limit: usize,
    out_dir: &Path,
) -> Result<Option<PathBuf>> {
    let now = Utc::now();
    match aggregator.run_at(range, limit, now).await {
        Ok(batch) => {
            let resp = NewsResponse::from_batch(batch, range, now, false);
            let path = out_dir.join(snapshot_file_name(now));
            write_json_atomic(&path, &resp)?;
            counter!("snapshot_writes_total").increment(1);
            tracing::info!(
                target: "ingest",
                path = %path.display(),
                returned = resp.returned_items,
                repos = resp.stats.github_repos_count,
                papers = resp.stats.papers_count,
                spaces = resp.stats.spaces_count,
                "snapshot written"
            );
            Ok(Some(path))
        }
        Err(err) => {
            let failure = FailureResponse::from(err);
            tracing::warn!(
                target: "ingest",
                error = %failure.error,
                failed = ?failure.failed_sources,
                "snapshot skipped"
            );
            Ok(None)
        }
    }
}

fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating snapshot dir {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_vec_pretty(value).context("serializing snapshot")?;
    std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
    Ok(())
}

/// Spawn a ticker that snapshots on every interval (first tick fires immediately).
pub fn spawn_snapshot_scheduler(
    aggregator: Arc<Aggregator>,
    cfg: SnapshotSchedulerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        loop {
            ticker.tick().await;
            counter!("snapshot_runs_total").increment(1);
            if let Err(e) = snapshot_once(&aggregator, cfg.range, cfg.limit, &cfg.out_dir).await {
                tracing::error!(target: "ingest", error = ?e, "snapshot failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::ingest::providers::JsonFeedFetcher;
    use crate::ingest::types::SourceFetcher;
    use chrono::TimeZone;

    #[test]
    fn file_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(snapshot_file_name(at), "news_20250102_030405.json");
    }

    #[tokio::test]
    async fn writes_snapshot_and_skips_empty_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let feed: Arc<dyn SourceFetcher> = Arc::new(JsonFeedFetcher::from_body(
            "papers",
            None,
            r#"[{"source":"paper","name":"p","url":"https://hf.co/papers/1","upvotes":3}]"#,
        ));
        let agg = Aggregator::new(vec![feed], ScoringConfig::default());
        let path = snapshot_once(&agg, TimeRange::Daily, 30, tmp.path())
            .await
            .unwrap()
            .expect("snapshot path");
        let v: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(v["returned_items"], 1);
        assert_eq!(v["data"]["papers"][0]["name"], "p");

        let empty = Aggregator::new(vec![], ScoringConfig::default());
        assert!(snapshot_once(&empty, TimeRange::Daily, 30, tmp.path())
            .await
            .unwrap()
            .is_none());
    }
}
