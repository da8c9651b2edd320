// src/enrich/mod.rs
//! Bounded-concurrency enrichment.
//!
//! Each item gets one generation call. At most `max_workers` calls are in
//! flight at a time (semaphore permits). Every call is wrapped so that an
//! error, a timeout, an unparseable answer or even a panic only affects its
//! own item, which then receives the fallback values. The batch returns once
//! every task has finished.

pub mod generator;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::ai::{AiConfig, DEFAULT_MAX_WORKERS};
use crate::error::{EnrichError, GenerateError};
use crate::model::TrendingItem;

pub use generator::{
    build_generator, ClaudeGenerator, DisabledGenerator, DynGenerator, MockGenerator,
    OpenAiGenerator, TextGenerator,
};
pub use prompt::{build_context, build_prompt, fallback, parse_response, Enrichment};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        metrics::describe_counter!("enrich_calls_total", "Generation calls issued.");
        metrics::describe_counter!(
            "enrich_fallbacks_total",
            "Items that received fallback summary/reason."
        );
    });
}

/// Why an item ended up with fallback values.
#[derive(Debug, thiserror::Error)]
enum ItemFailure {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("unparseable response: {0}")]
    Parse(#[from] prompt::ParseError),
}

pub struct Enricher {
    generator: DynGenerator,
    max_workers: usize,
    call_timeout: Duration,
}

impl Enricher {
    pub fn new(generator: DynGenerator) -> Self {
        Self {
            generator,
            max_workers: DEFAULT_MAX_WORKERS,
            call_timeout: Duration::from_secs(20),
        }
    }

    pub fn from_config(generator: DynGenerator, cfg: &AiConfig) -> Self {
        Self::new(generator)
            .with_max_workers(cfg.max_workers)
            .with_call_timeout(Duration::from_secs(cfg.timeout_secs))
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn provider_name(&self) -> &'static str {
        self.generator.provider_name()
    }

    /// Enrich with the configured pool size.
    pub async fn enrich_items(
        &self,
        items: Vec<TrendingItem>,
    ) -> Result<Vec<TrendingItem>, EnrichError> {
        self.enrich(items, self.max_workers).await
    }

    /// Populate `ai_summary` and `ai_trending_reason` on every item.
    ///
    /// Items come back in submission order, but callers that care about rank
    /// should re-sort by score.
    pub async fn enrich(
        &self,
        mut items: Vec<TrendingItem>,
        max_workers: usize,
    ) -> Result<Vec<TrendingItem>, EnrichError> {
        if items.is_empty() {
            return Err(EnrichError::EmptyInput);
        }
        ensure_metrics_described();

        let permits = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut tasks: JoinSet<(usize, Result<Enrichment, ItemFailure>)> = JoinSet::new();

        for (idx, item) in items.iter().enumerate() {
            let generator = Arc::clone(&self.generator);
            let permits = Arc::clone(&permits);
            let prompt = build_prompt(item);
            let timeout = self.call_timeout;
            tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails on misuse.
                let _permit = permits.acquire_owned().await;
                counter!("enrich_calls_total").increment(1);
                (idx, generate_one(generator.as_ref(), &prompt, timeout).await)
            });
        }

        let mut results: Vec<Option<Enrichment>> = vec![None; items.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(enrichment))) => results[idx] = Some(enrichment),
                Ok((idx, Err(err))) => {
                    tracing::warn!(
                        target: "enrich",
                        item = %items[idx].name,
                        error = %err,
                        "enrichment failed; using fallback"
                    );
                }
                Err(join_err) => {
                    // The item's slot stays empty and gets the fallback below.
                    tracing::error!(target: "enrich", error = %join_err, "enrichment task aborted");
                }
            }
        }

        for (item, result) in items.iter_mut().zip(results) {
            let enrichment = result.unwrap_or_else(|| {
                counter!("enrich_fallbacks_total").increment(1);
                fallback(item)
            });
            item.ai_summary = Some(enrichment.summary);
            item.ai_trending_reason = Some(enrichment.trending_reason);
        }

        Ok(items)
    }
}

async fn generate_one(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<Enrichment, ItemFailure> {
    let text = tokio::time::timeout(timeout, generator.generate(prompt))
        .await
        .map_err(|_| GenerateError::Timeout(timeout))??;
    Ok(parse_response(&text)?)
}
