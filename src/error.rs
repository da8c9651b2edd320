// src/error.rs
//! Error taxonomy for the aggregation and enrichment paths.
//!
//! Fetcher failures and per-item enrichment failures are absorbed where they
//! happen; only the variants below ever reach a caller.

use std::time::Duration;

/// Whole-run failure surfaced by the aggregator.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    /// Every fetcher failed or returned nothing.
    #[error("No items found")]
    NoItems { failed_fetchers: Vec<String> },
}

/// Misuse of the enrichment entry point.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EnrichError {
    #[error("enrichment requested for an empty item set")]
    EmptyInput,
}

/// A single call to the generation service failed.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generation is disabled")]
    Disabled,
    #[error("missing API key for provider {0}")]
    MissingApiKey(&'static str),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(u16),
    #[error("provider returned no text")]
    EmptyResponse,
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

/// A raw record that could not be turned into an item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRecord {
    #[error("missing or unknown source tag")]
    UnknownSource,
    #[error("missing name")]
    MissingName,
    #[error("missing or invalid url")]
    InvalidUrl,
}
