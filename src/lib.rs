// src/lib.rs
// Public library surface for integration tests and the binaries.

pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod rank;
pub mod report;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

pub use crate::api::{create_router, AppState};
pub use crate::enrich::Enricher;
pub use crate::error::{AggregationError, EnrichError, GenerateError, MalformedRecord};
pub use crate::ingest::Aggregator;
pub use crate::model::{RankedBatch, SourceDetails, SourceKind, TimeRange, TrendingItem};

/// Build aggregator + enricher from the on-disk configuration
/// (`config/sources.toml`, `config/scoring.toml`, `config/ai.json`, or the
/// paths named by their env overrides).
pub fn build_state_from_config() -> anyhow::Result<AppState> {
    let specs = ingest::config::load_sources_default().context("loading sources config")?;
    let fetchers = ingest::config::build_fetchers(&specs).context("building fetchers")?;
    let scoring = config::ScoringConfig::load_default().context("loading scoring config")?;
    let ai_cfg = config::AiConfig::load_default().context("loading ai config")?;
    let generator = enrich::build_generator(&ai_cfg)?;

    let aggregator = Aggregator::new(fetchers, scoring);
    info!(
        fetchers = ?aggregator.fetcher_names(),
        recency_floor = aggregator.scoring().recency.floor,
        provider = generator.provider_name(),
        ai_enabled = ai_cfg.enabled,
        max_workers = ai_cfg.max_workers,
        "state built from config"
    );
    if specs.is_empty() {
        tracing::warn!("no fetchers configured; every aggregation run will report no items");
    }

    Ok(AppState {
        aggregator: Arc::new(aggregator),
        enricher: Arc::new(Enricher::from_config(generator, &ai_cfg)),
    })
}

/// Full application router (API + `/metrics` when a recorder is supplied).
pub fn app(state: AppState, metrics: Option<&crate::metrics::Metrics>) -> axum::Router {
    let api = create_router(state);
    match metrics {
        Some(m) => api.merge(m.router()),
        None => api,
    }
}
