// src/ingest/types.rs
use anyhow::Result;

use crate::model::{SourceKind, TimeRange};

/// Loosely-typed record as produced by a fetcher (one JSON object).
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch_items(&self, range: TimeRange) -> Result<Vec<RawRecord>>;
    fn name(&self) -> &str;
    /// Source tag applied to records that don't carry their own.
    fn default_source(&self) -> Option<SourceKind> {
        None
    }
}
