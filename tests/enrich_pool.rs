// tests/enrich_pool.rs
//
// Worker-pool behaviour of the enricher: bounded concurrency, per-item
// fallback, and order preservation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ai_trends_aggregator::enrich::prompt::FALLBACK_REASON;
use ai_trends_aggregator::enrich::{Enricher, MockGenerator, TextGenerator};
use ai_trends_aggregator::{EnrichError, GenerateError, SourceDetails, TrendingItem};
use async_trait::async_trait;
use parking_lot::Mutex;

fn repos(n: usize) -> Vec<TrendingItem> {
    (0..n)
        .map(|i| {
            TrendingItem::new(
                format!("org/repo-{i}"),
                format!("https://github.com/org/repo-{i}"),
                SourceDetails::Repository {
                    stars: 1_000 + i as u64,
                    stars_today: 10,
                    forks: 0,
                    language: Some("Rust".into()),
                    topics: vec!["llm".into()],
                },
            )
            .with_description(format!("Repository number {i}"))
        })
        .collect()
}

/// Records the peak number of concurrent calls, then fails or answers.
struct CountingGenerator {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl CountingGenerator {
    fn new(fail: bool) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            fail,
        }
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        tokio::time::sleep(Duration::from_millis(15)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            Err(GenerateError::Status(503))
        } else {
            Ok("Some preamble\nSUMMARY: Fast local inference.\nTRENDING: New release this week.".into())
        }
    }
    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_never_exceeds_max_workers() {
    let counting = Arc::new(CountingGenerator::new(false));
    let enricher = Enricher::new(counting.clone()).with_max_workers(3);

    let out = enricher.enrich_items(repos(20)).await.expect("non-empty input");
    assert_eq!(out.len(), 20);
    assert_eq!(counting.calls.load(Ordering::SeqCst), 20);
    assert_eq!(counting.prompts.lock().len(), 20);
    let peak = counting.peak.load(Ordering::SeqCst);
    assert!((1..=3).contains(&peak), "peak concurrency was {peak}");

    for (i, item) in out.iter().enumerate() {
        assert_eq!(item.name, format!("org/repo-{i}"), "submission order kept");
        assert_eq!(item.ai_summary.as_deref(), Some("Fast local inference."));
        assert_eq!(item.ai_trending_reason.as_deref(), Some("New release this week."));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_provider_gives_every_item_a_fallback() {
    let counting = Arc::new(CountingGenerator::new(true));
    let enricher = Enricher::new(counting.clone()).with_max_workers(2);

    let out = enricher.enrich(repos(7), 2).await.expect("never propagates item errors");
    assert_eq!(counting.calls.load(Ordering::SeqCst), 7);
    assert!(counting.peak.load(Ordering::SeqCst) <= 2);
    for item in &out {
        let summary = item.ai_summary.as_deref().unwrap_or_default();
        assert!(!summary.is_empty());
        assert_eq!(summary, item.description);
        assert_eq!(item.ai_trending_reason.as_deref(), Some(FALLBACK_REASON));
    }
}

#[tokio::test]
async fn slow_calls_time_out_into_fallback() {
    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("SUMMARY: late\nTRENDING: late".into())
        }
        fn provider_name(&self) -> &'static str {
            "stalled"
        }
    }

    let enricher = Enricher::new(Arc::new(Stalled)).with_call_timeout(Duration::from_millis(20));
    let out = enricher.enrich_items(repos(2)).await.unwrap();
    assert!(out
        .iter()
        .all(|i| i.ai_trending_reason.as_deref() == Some(FALLBACK_REASON)));
}

#[tokio::test]
async fn empty_input_is_rejected() {
    let enricher = Enricher::new(Arc::new(MockGenerator::default()));
    assert_eq!(enricher.enrich(Vec::new(), 4).await.unwrap_err(), EnrichError::EmptyInput);
}
