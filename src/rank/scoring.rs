//! Popularity x recency scoring.
//!
//! `score = (base + Σ w_metric * metric) * recency_multiplier`
//!
//! The multiplier is `FULL_WEIGHT` inside the lookback window (and for items
//! without a timestamp). Past the window it decays hyperbolically towards
//! `floor` without ever reaching it:
//!
//! `floor + (1 - floor) * L / (L + excess_days)`, `L = lookback_days * decay_scale`.

use chrono::{DateTime, Utc};

use crate::config::{RecencyConfig, ScoringConfig};
use crate::model::TrendingItem;

pub const FULL_WEIGHT: f64 = 1.0;

const SECS_PER_DAY: f64 = 86_400.0;

/// Recency multiplier for an item published at `published_at`.
pub fn recency_multiplier(
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    lookback_days: u32,
    cfg: &RecencyConfig,
) -> f64 {
    let Some(at) = published_at else {
        return FULL_WEIGHT;
    };
    let lookback = f64::from(lookback_days.max(1));
    let age_days = (now - at).num_seconds() as f64 / SECS_PER_DAY;
    if age_days <= lookback {
        return FULL_WEIGHT;
    }
    let excess = age_days - lookback;
    let scale = lookback * cfg.decay_scale;
    cfg.floor + (FULL_WEIGHT - cfg.floor) * scale / (scale + excess)
}

/// Popularity before recency weighting.
pub fn base_popularity(item: &TrendingItem, cfg: &ScoringConfig) -> f64 {
    let sw = cfg.for_source(item.source());
    item.popularity_metrics()
        .into_iter()
        .fold(sw.base, |acc, (metric, value)| acc + sw.weight(metric) * value)
}

pub fn score_item(
    item: &TrendingItem,
    lookback_days: u32,
    now: DateTime<Utc>,
    cfg: &ScoringConfig,
) -> f64 {
    let raw = base_popularity(item, cfg)
        * recency_multiplier(item.published_at, now, lookback_days, &cfg.recency);
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}

/// Score every well-formed item in place. Items without a name or url are
/// logged and dropped; the rest keep their relative order.
pub fn score_items(
    items: Vec<TrendingItem>,
    lookback_days: u32,
    now: DateTime<Utc>,
    cfg: &ScoringConfig,
) -> Vec<TrendingItem> {
    let mut out = Vec::with_capacity(items.len());
    for mut item in items {
        if item.name.trim().is_empty() || item.url.trim().is_empty() {
            tracing::warn!(
                target: "rank",
                source = %item.source(),
                url = %item.url,
                "skipping malformed item during scoring"
            );
            continue;
        }
        item.score = Some(score_item(&item, lookback_days, now, cfg));
        out.push(item);
    }
    out
}
