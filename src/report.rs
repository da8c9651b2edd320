// src/report.rs
//! Wire shapes for aggregation results, shared by the HTTP layer and the
//! snapshot writer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AggregationError;
use crate::model::{RankedBatch, SourceKind, TimeRange, TrendingItem};

#[derive(Debug, Serialize)]
pub struct NewsData {
    pub github_repos: Vec<TrendingItem>,
    pub github_collections: Vec<TrendingItem>,
    pub papers: Vec<TrendingItem>,
    pub spaces: Vec<TrendingItem>,
    pub all_items: Vec<TrendingItem>,
}

#[derive(Debug, Serialize)]
pub struct NewsStats {
    pub github_repos_count: usize,
    pub papers_count: usize,
    pub spaces_count: usize,
    pub collections_count: usize,
}

#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub time_range: TimeRange,
    pub total_items: usize,
    pub returned_items: usize,
    pub data: NewsData,
    pub stats: NewsStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_sources: Vec<String>,
    pub enriched: bool,
}

impl NewsResponse {
    pub fn from_batch(
        batch: RankedBatch,
        time_range: TimeRange,
        timestamp: DateTime<Utc>,
        enriched: bool,
    ) -> Self {
        let RankedBatch {
            items,
            mut grouped,
            total_fetched,
            total_returned,
            counts,
            failed_fetchers,
        } = batch;
        let count = |k: SourceKind| counts.get(&k).copied().unwrap_or(0);
        let stats = NewsStats {
            github_repos_count: count(SourceKind::Repository),
            papers_count: count(SourceKind::Paper),
            spaces_count: count(SourceKind::Space),
            collections_count: count(SourceKind::Collection),
        };
        let mut take = |k: SourceKind| grouped.remove(&k).unwrap_or_default();
        let data = NewsData {
            github_repos: take(SourceKind::Repository),
            github_collections: take(SourceKind::Collection),
            papers: take(SourceKind::Paper),
            spaces: take(SourceKind::Space),
            all_items: items,
        };
        Self {
            success: true,
            timestamp,
            time_range,
            total_items: total_fetched,
            returned_items: total_returned,
            data,
            stats,
            failed_sources: failed_fetchers,
            enriched,
        }
    }
}

/// Structured failure: `success=false` and an empty `data` array.
#[derive(Debug, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub data: Vec<TrendingItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_sources: Vec<String>,
}

impl FailureResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            data: Vec::new(),
            failed_sources: Vec::new(),
        }
    }
}

impl From<AggregationError> for FailureResponse {
    fn from(err: AggregationError) -> Self {
        let message = err.to_string();
        match err {
            AggregationError::NoItems { failed_fetchers } => Self {
                failed_sources: failed_fetchers,
                ..Self::new(message)
            },
        }
    }
}

/// Single-source listing.
#[derive(Debug, Serialize)]
pub struct SourceListResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub source: SourceKind,
    pub count: usize,
    pub data: Vec<TrendingItem>,
}
