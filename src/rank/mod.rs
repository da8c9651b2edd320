// src/rank/mod.rs
//! Ranking engine: scoring -> dedup -> top-N -> grouping.
//!
//! Every stage is synchronous and works on an owned, in-memory collection.

pub mod dedup;
pub mod group;
pub mod scoring;
pub mod select;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::config::ScoringConfig;
use crate::model::{SourceKind, TrendingItem};

pub use dedup::{canonical_url, dedupe, dedupe_counted};
pub use group::{group_by_source, group_counts};
pub use scoring::{recency_multiplier, score_item, score_items, FULL_WEIGHT};
pub use select::select_top;

/// Result of running the ranking stages over one batch.
#[derive(Debug, Clone)]
pub struct Ranked {
    pub top: Vec<TrendingItem>,
    pub grouped: BTreeMap<SourceKind, Vec<TrendingItem>>,
    pub duplicates: usize,
}

pub fn rank(
    items: Vec<TrendingItem>,
    lookback_days: u32,
    limit: usize,
    now: DateTime<Utc>,
    cfg: &ScoringConfig,
) -> Ranked {
    let scored = score_items(items, lookback_days, now, cfg);
    let (unique, duplicates) = dedupe_counted(scored);
    let top = select_top(unique, limit);
    let grouped = group_by_source(&top);
    Ranked {
        top,
        grouped,
        duplicates,
    }
}
