use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use serde_json::Value;

use crate::ingest::types::{RawRecord, SourceFetcher};
use crate::model::{SourceKind, TimeRange};

/// Fetcher for feeds already shaped as JSON records: either a top-level array,
/// or an object wrapping the array under `items` / `data`.
pub struct JsonFeedFetcher {
    name: String,
    source: Option<SourceKind>,
    mode: Mode,
}

enum Mode {
    Inline(String),
    File(PathBuf),
    Http { url: String, client: reqwest::Client },
}

impl JsonFeedFetcher {
    /// In-memory payload; handy for tests and fixtures.
    pub fn from_body(name: impl Into<String>, source: Option<SourceKind>, body: &str) -> Self {
        Self {
            name: name.into(),
            source,
            mode: Mode::Inline(body.to_string()),
        }
    }

    pub fn from_file(
        name: impl Into<String>,
        source: Option<SourceKind>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            mode: Mode::File(path.into()),
        }
    }

    /// GET `url?range=<daily|weekly|monthly>`.
    pub fn from_url(
        name: impl Into<String>,
        source: Option<SourceKind>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ai-trends-aggregator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self {
            name: name.into(),
            source,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    fn parse_records(&self, body: &str) -> Result<Vec<RawRecord>> {
        let t0 = std::time::Instant::now();
        let v: Value = serde_json::from_str(body)
            .with_context(|| format!("parsing json feed '{}'", self.name))?;
        let array = match v {
            Value::Array(xs) => xs,
            Value::Object(mut obj) => match obj.remove("items").or_else(|| obj.remove("data")) {
                Some(Value::Array(xs)) => xs,
                _ => return Err(anyhow!("feed '{}' has no items array", self.name)),
            },
            _ => return Err(anyhow!("feed '{}' is not an array or object", self.name)),
        };

        let mut out = Vec::with_capacity(array.len());
        for entry in array {
            match entry {
                Value::Object(map) => out.push(map),
                other => tracing::debug!(
                    target: "ingest",
                    fetcher = %self.name,
                    kind = json_kind(&other),
                    "skipping non-object feed entry"
                ),
            }
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl SourceFetcher for JsonFeedFetcher {
    async fn fetch_items(&self, range: TimeRange) -> Result<Vec<RawRecord>> {
        match &self.mode {
            Mode::Inline(s) => self.parse_records(s),
            Mode::File(path) => {
                let body = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading feed file {}", path.display()))?;
                self.parse_records(&body)
            }
            Mode::Http { url, client } => {
                let sep = if url.contains('?') { '&' } else { '?' };
                let resp = client
                    .get(format!("{url}{sep}range={range}"))
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(anyhow!("GET {url} returned {status}"));
                }
                let body = resp.text().await.context("reading feed body")?;
                self.parse_records(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_source(&self) -> Option<SourceKind> {
        self.source
    }
}
