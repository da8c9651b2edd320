// src/ingest/mod.rs
//! Pipeline coordinator: fetch -> normalize -> rank.
//!
//! Fetchers are injected at construction and run concurrently. A fetcher that
//! errors (or panics) is logged and left out; the run only fails when nothing
//! at all was fetched.

pub mod config;
pub mod normalize;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::config::ScoringConfig;
use crate::error::AggregationError;
use crate::model::{RankedBatch, SourceKind, TimeRange};
use crate::rank::{self, group_counts};
use crate::ingest::types::{RawRecord, SourceFetcher};

pub use normalize::{normalize_batch, normalize_record, normalize_text};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregation_runs_total", "Aggregation runs started.");
        describe_counter!("aggregation_records_total", "Raw records fetched.");
        describe_counter!(
            "aggregation_fetcher_errors_total",
            "Fetcher errors (excluded from the run)."
        );
        describe_counter!(
            "aggregation_malformed_total",
            "Records dropped by normalization."
        );
        describe_counter!(
            "aggregation_duplicates_total",
            "Items removed by deduplication."
        );
        describe_counter!(
            "aggregation_empty_total",
            "Runs that ended with no items."
        );
        describe_histogram!("aggregation_run_ms", "Aggregation wall time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "aggregation_last_run_ts",
            "Unix ts when the aggregation last ran."
        );
    });
}

/// Raw records from every fetcher that succeeded, in fetcher order.
pub struct FetchOutcome {
    pub records: Vec<(Option<SourceKind>, RawRecord)>,
    pub failed: Vec<String>,
}

/// Invoke every fetcher concurrently, tolerating individual failures.
pub async fn fetch_all(fetchers: &[Arc<dyn SourceFetcher>], range: TimeRange) -> FetchOutcome {
    let mut tasks = JoinSet::new();
    for (idx, fetcher) in fetchers.iter().enumerate() {
        let fetcher = Arc::clone(fetcher);
        tasks.spawn(async move { (idx, fetcher.fetch_items(range).await) });
    }

    let mut slots: Vec<Option<Vec<RawRecord>>> = vec![None; fetchers.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, Ok(records))) => slots[idx] = Some(records),
            Ok((idx, Err(e))) => {
                tracing::warn!(target: "ingest", error = ?e, fetcher = fetchers[idx].name(), "fetcher error");
            }
            Err(join_err) => {
                tracing::error!(target: "ingest", error = %join_err, "fetcher task aborted");
            }
        }
    }

    let mut records = Vec::new();
    let mut failed = Vec::new();
    for (fetcher, slot) in fetchers.iter().zip(slots) {
        match slot {
            Some(batch) => {
                let default_source = fetcher.default_source();
                records.extend(batch.into_iter().map(|r| (default_source, r)));
            }
            None => {
                counter!("aggregation_fetcher_errors_total").increment(1);
                failed.push(fetcher.name().to_string());
            }
        }
    }
    FetchOutcome { records, failed }
}

/// Drives one aggregation run over a fixed set of fetchers.
pub struct Aggregator {
    fetchers: Vec<Arc<dyn SourceFetcher>>,
    scoring: ScoringConfig,
}

impl Aggregator {
    pub fn new(fetchers: Vec<Arc<dyn SourceFetcher>>, scoring: ScoringConfig) -> Self {
        Self { fetchers, scoring }
    }

    pub fn fetcher_names(&self) -> Vec<String> {
        self.fetchers.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// `limit` must already be clamped by the caller.
    pub async fn run(&self, range: TimeRange, limit: usize) -> Result<RankedBatch, AggregationError> {
        self.run_at(range, limit, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit "now" for recency.
    ///
    /// Fails with [`AggregationError::NoItems`] when nothing was fetched, or
    /// when every fetched record was dropped as malformed.
    pub async fn run_at(
        &self,
        range: TimeRange,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<RankedBatch, AggregationError> {
        ensure_metrics_described();
        counter!("aggregation_runs_total").increment(1);
        let t0 = std::time::Instant::now();

        let FetchOutcome { records, failed } = fetch_all(&self.fetchers, range).await;
        let total_fetched = records.len();
        counter!("aggregation_records_total").increment(total_fetched as u64);

        if total_fetched == 0 {
            counter!("aggregation_empty_total").increment(1);
            tracing::warn!(target: "ingest", failed = ?failed, %range, "no items fetched");
            return Err(AggregationError::NoItems {
                failed_fetchers: failed,
            });
        }

        let (items, malformed) = normalize_batch(records);
        counter!("aggregation_malformed_total").increment(malformed as u64);
        if items.is_empty() {
            counter!("aggregation_empty_total").increment(1);
            tracing::warn!(target: "ingest", malformed, %range, "every fetched record was malformed");
            return Err(AggregationError::NoItems {
                failed_fetchers: failed,
            });
        }

        let ranked = rank::rank(items, range.lookback_days(), limit, now, &self.scoring);
        counter!("aggregation_duplicates_total").increment(ranked.duplicates as u64);

        let counts = group_counts(&ranked.grouped);
        let total_returned = ranked.top.len();

        histogram!("aggregation_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("aggregation_last_run_ts").set(now.timestamp() as f64);
        tracing::info!(
            target: "ingest",
            %range,
            total_fetched,
            malformed,
            duplicates = ranked.duplicates,
            total_returned,
            failed = failed.len(),
            "aggregation finished"
        );

        Ok(RankedBatch {
            items: ranked.top,
            grouped: ranked.grouped,
            total_fetched,
            total_returned,
            counts,
            failed_fetchers: failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    struct Fixed(&'static str, Vec<RawRecord>);

    #[async_trait]
    impl SourceFetcher for Fixed {
        async fn fetch_items(&self, _range: TimeRange) -> anyhow::Result<Vec<RawRecord>> {
            Ok(self.1.clone())
        }
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Broken;

    #[async_trait]
    impl SourceFetcher for Broken {
        async fn fetch_items(&self, _range: TimeRange) -> anyhow::Result<Vec<RawRecord>> {
            Err(anyhow!("upstream 503"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    struct Exploding;

    #[async_trait]
    impl SourceFetcher for Exploding {
        async fn fetch_items(&self, _range: TimeRange) -> anyhow::Result<Vec<RawRecord>> {
            panic!("parser bug")
        }
        fn name(&self) -> &str {
            "exploding"
        }
    }

    fn paper(i: u64) -> RawRecord {
        json!({"source": "paper", "name": format!("p{i}"), "url": format!("https://hf.co/papers/{i}"), "upvotes": i})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn failed_fetcher_is_excluded_and_reported() {
        let agg = Aggregator::new(
            vec![Arc::new(Broken), Arc::new(Fixed("papers", vec![paper(1), paper(2)]))],
            ScoringConfig::default(),
        );
        let batch = agg.run(TimeRange::Daily, 10).await.unwrap();
        assert_eq!(batch.total_fetched, 2);
        assert_eq!(batch.failed_fetchers, vec!["broken".to_string()]);
        assert_eq!(batch.items[0].name, "p2");
    }

    #[tokio::test]
    async fn malformed_records_do_not_affect_siblings() {
        let mut bad = paper(9);
        bad.remove("url");
        let agg = Aggregator::new(
            vec![Arc::new(Fixed("papers", vec![bad, paper(3)]))],
            ScoringConfig::default(),
        );
        let batch = agg.run(TimeRange::Weekly, 10).await.unwrap();
        assert_eq!(batch.total_fetched, 2);
        assert_eq!(batch.total_returned, 1);
        assert_eq!(batch.counts[&SourceKind::Paper], 1);
    }

    #[tokio::test]
    async fn nothing_fetched_is_a_structured_failure() {
        let agg = Aggregator::new(
            vec![Arc::new(Broken), Arc::new(Fixed("empty", vec![]))],
            ScoringConfig::default(),
        );
        match agg.run(TimeRange::Daily, 10).await {
            Err(AggregationError::NoItems { failed_fetchers }) => {
                assert_eq!(failed_fetchers, vec!["broken".to_string()]);
            }
            other => panic!("expected NoItems, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_fetcher_is_recorded_as_failed() {
        let agg = Aggregator::new(
            vec![
                Arc::new(Fixed("papers", vec![paper(1)])),
                Arc::new(Exploding),
                Arc::new(Broken),
            ],
            ScoringConfig::default(),
        );
        let batch = agg.run(TimeRange::Daily, 10).await.unwrap();
        assert_eq!(batch.total_returned, 1);
        assert_eq!(
            batch.failed_fetchers,
            vec!["exploding".to_string(), "broken".to_string()]
        );
    }

    #[tokio::test]
    async fn only_malformed_records_is_no_items() {
        let mut no_url = paper(1);
        no_url.remove("url");
        let mut no_name = paper(2);
        no_name.remove("name");
        let agg = Aggregator::new(
            vec![Arc::new(Fixed("papers", vec![no_url, no_name]))],
            ScoringConfig::default(),
        );
        match agg.run(TimeRange::Daily, 10).await {
            Err(AggregationError::NoItems { failed_fetchers }) => assert!(failed_fetchers.is_empty()),
            other => panic!("expected NoItems, got {other:?}"),
        }
    }
}
