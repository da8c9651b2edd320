// src/model.rs
//! Common item schema shared by every stage of the pipeline.
//!
//! Fetchers hand over loosely-typed records; the normalizer turns them into
//! [`TrendingItem`]s, which then flow forward through scoring, dedup,
//! selection, grouping and (optionally) enrichment.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Where an item originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Repository,
    Collection,
    Paper,
    Space,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Repository,
        SourceKind::Collection,
        SourceKind::Paper,
        SourceKind::Space,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Repository => "repository",
            SourceKind::Collection => "collection",
            SourceKind::Paper => "paper",
            SourceKind::Space => "space",
        }
    }

    /// Resolve a source tag, accepting the aliases upstream fetchers use.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let t = tag.trim().to_ascii_lowercase().replace('-', "_");
        match t.as_str() {
            "repository" | "repo" | "github" | "github_trending" | "github_repo" => {
                Some(SourceKind::Repository)
            }
            "collection" | "github_collection" | "github_explore" => Some(SourceKind::Collection),
            "paper" | "papers" | "huggingface_papers" | "hf_paper" => Some(SourceKind::Paper),
            "space" | "spaces" | "huggingface_spaces" | "hf_space" => Some(SourceKind::Space),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-specific signals. The variant decides the item's [`SourceKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceDetails {
    Repository {
        stars: u64,
        stars_today: u64,
        forks: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        topics: Vec<String>,
    },
    Collection {
        item_count: u64,
    },
    Paper {
        upvotes: u64,
    },
    Space {
        likes: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        sdk: Option<String>,
    },
}

impl SourceDetails {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceDetails::Repository { .. } => SourceKind::Repository,
            SourceDetails::Collection { .. } => SourceKind::Collection,
            SourceDetails::Paper { .. } => SourceKind::Paper,
            SourceDetails::Space { .. } => SourceKind::Space,
        }
    }

    /// Zero-valued details for a source.
    pub fn empty(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Repository => SourceDetails::Repository {
                stars: 0,
                stars_today: 0,
                forks: 0,
                language: None,
                topics: Vec::new(),
            },
            SourceKind::Collection => SourceDetails::Collection { item_count: 0 },
            SourceKind::Paper => SourceDetails::Paper { upvotes: 0 },
            SourceKind::Space => SourceDetails::Space {
                likes: 0,
                sdk: None,
            },
        }
    }
}

/// One artifact in the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingItem {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(flatten)]
    pub details: SourceDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_trending_reason: Option<String>,
}

impl TrendingItem {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        details: SourceDetails,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            url: url.into(),
            details,
            published_at: None,
            score: None,
            ai_summary: None,
            ai_trending_reason: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn source(&self) -> SourceKind {
        self.details.kind()
    }

    /// Score for ordering; unscored items rank as zero.
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }

    /// Numeric popularity signals keyed by metric name.
    pub fn popularity_metrics(&self) -> BTreeMap<&'static str, f64> {
        let mut m = BTreeMap::new();
        match &self.details {
            SourceDetails::Repository {
                stars,
                stars_today,
                forks,
                ..
            } => {
                m.insert("stars", *stars as f64);
                m.insert("stars_today", *stars_today as f64);
                m.insert("forks", *forks as f64);
            }
            SourceDetails::Collection { item_count } => {
                m.insert("item_count", *item_count as f64);
            }
            SourceDetails::Paper { upvotes } => {
                m.insert("upvotes", *upvotes as f64);
            }
            SourceDetails::Space { likes, .. } => {
                m.insert("likes", *likes as f64);
            }
        }
        m
    }
}

/// Requested lookback, as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl TimeRange {
    pub fn lookback_days(self) -> u32 {
        match self {
            TimeRange::Daily => 1,
            TimeRange::Weekly => 7,
            TimeRange::Monthly => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Daily => "daily",
            TimeRange::Weekly => "weekly",
            TimeRange::Monthly => "monthly",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time range '{0}': must be daily, weekly, or monthly")]
pub struct InvalidTimeRange(pub String);

impl FromStr for TimeRange {
    type Err = InvalidTimeRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(TimeRange::Daily),
            "weekly" => Ok(TimeRange::Weekly),
            "monthly" => Ok(TimeRange::Monthly),
            _ => Err(InvalidTimeRange(s.to_string())),
        }
    }
}

/// Output of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct RankedBatch {
    pub items: Vec<TrendingItem>,
    pub grouped: BTreeMap<SourceKind, Vec<TrendingItem>>,
    pub total_fetched: usize,
    pub total_returned: usize,
    pub counts: BTreeMap<SourceKind, usize>,
    pub failed_fetchers: Vec<String>,
}

impl RankedBatch {
    pub fn group(&self, kind: SourceKind) -> &[TrendingItem] {
        self.grouped.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}
