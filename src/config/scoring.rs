// src/config/scoring.rs
//! Scoring tunables, loaded from TOML.
//!
//! ```toml
//! [recency]
//! floor = 0.1
//! decay_scale = 1.0
//!
//! [repository]
//! base = 0.0
//! weights = { stars = 0.01, stars_today = 1.0 }
//! ```
//!
//! Every section is optional; omitted sections keep the built-in defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::SourceKind;

pub const ENV_SCORING_CONFIG_PATH: &str = "SCORING_CONFIG_PATH";
pub const DEFAULT_SCORING_CONFIG_PATH: &str = "config/scoring.toml";

pub const DEFAULT_RECENCY_FLOOR: f64 = 0.1;
pub const DEFAULT_DECAY_SCALE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyConfig {
    /// Lower bound of the recency multiplier, in (0, 1).
    #[serde(default = "default_floor")]
    pub floor: f64,
    /// Decay half-distance past the window, as a multiple of the lookback.
    #[serde(default = "default_decay_scale")]
    pub decay_scale: f64,
}

fn default_floor() -> f64 {
    DEFAULT_RECENCY_FLOOR
}
fn default_decay_scale() -> f64 {
    DEFAULT_DECAY_SCALE
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self {
            floor: DEFAULT_RECENCY_FLOOR,
            decay_scale: DEFAULT_DECAY_SCALE,
        }
    }
}

/// Per-source popularity formula: `base + Σ weights[metric] * value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SourceWeights {
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
}

impl SourceWeights {
    fn seeded(base: f64, pairs: &[(&str, f64)]) -> Self {
        Self {
            base,
            weights: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    pub fn weight(&self, metric: &str) -> f64 {
        self.weights.get(metric).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub recency: RecencyConfig,
    #[serde(default = "repository_seed")]
    pub repository: SourceWeights,
    #[serde(default = "collection_seed")]
    pub collection: SourceWeights,
    #[serde(default = "paper_seed")]
    pub paper: SourceWeights,
    #[serde(default = "space_seed")]
    pub space: SourceWeights,
}

// Star velocity dominates raw stars for repositories.
fn repository_seed() -> SourceWeights {
    SourceWeights::seeded(0.0, &[("stars", 0.01), ("stars_today", 1.0), ("forks", 0.0)])
}
fn collection_seed() -> SourceWeights {
    SourceWeights::seeded(25.0, &[("item_count", 2.0)])
}
fn paper_seed() -> SourceWeights {
    SourceWeights::seeded(0.0, &[("upvotes", 3.0)])
}
fn space_seed() -> SourceWeights {
    SourceWeights::seeded(0.0, &[("likes", 0.5)])
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recency: RecencyConfig::default(),
            repository: repository_seed(),
            collection: collection_seed(),
            paper: paper_seed(),
            space: space_seed(),
        }
    }
}

impl ScoringConfig {
    pub fn for_source(&self, kind: SourceKind) -> &SourceWeights {
        match kind {
            SourceKind::Repository => &self.repository,
            SourceKind::Collection => &self.collection,
            SourceKind::Paper => &self.paper,
            SourceKind::Space => &self.space,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ScoringConfig = toml::from_str(s).context("parsing scoring config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scoring config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// 1) $SCORING_CONFIG_PATH (must exist)
    /// 2) config/scoring.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SCORING_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_SCORING_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let p = PathBuf::from(DEFAULT_SCORING_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }

    /// Force every tunable into its valid domain.
    pub fn sanitized(mut self) -> Self {
        let r = &mut self.recency;
        if !(r.floor.is_finite() && r.floor > 0.0 && r.floor < 1.0) {
            r.floor = DEFAULT_RECENCY_FLOOR;
        }
        if !(r.decay_scale.is_finite() && r.decay_scale > 0.0) {
            r.decay_scale = DEFAULT_DECAY_SCALE;
        }
        for sw in [
            &mut self.repository,
            &mut self.collection,
            &mut self.paper,
            &mut self.space,
        ] {
            sw.base = non_negative(sw.base);
            for w in sw.weights.values_mut() {
                *w = non_negative(*w);
            }
        }
        self
    }
}

fn non_negative(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}
