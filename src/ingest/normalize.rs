// src/ingest/normalize.rs
//! Raw record -> [`TrendingItem`] conversion.
//!
//! Fetchers disagree on field names and number formats (`"1,234"`, `"1.2k"`,
//! plain JSON numbers), so every field is looked up under its known aliases and
//! coerced. Only a missing source, name or url makes a record malformed; bad
//! metrics or timestamps degrade to zero / absent.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;

use crate::error::MalformedRecord;
use crate::ingest::types::RawRecord;
use crate::model::{SourceDetails, SourceKind, TrendingItem};

const MAX_TEXT_CHARS: usize = 1500;
const MAX_TOPICS: usize = 20;

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Convert one raw record. `default_source` is the fetcher's own tag, used when
/// the record carries none.
pub fn normalize_record(
    raw: &RawRecord,
    default_source: Option<SourceKind>,
) -> Result<TrendingItem, MalformedRecord> {
    let source = match first_str(raw, &["source", "type", "kind"]) {
        Some(tag) => SourceKind::from_tag(&tag).ok_or(MalformedRecord::UnknownSource)?,
        None => default_source.ok_or(MalformedRecord::UnknownSource)?,
    };

    let name = first_str(raw, &["name", "title", "full_name", "id"])
        .map(|s| normalize_text(&s))
        .filter(|s| !s.is_empty())
        .ok_or(MalformedRecord::MissingName)?;

    let url = first_str(raw, &["url", "link", "html_url"])
        .map(|s| s.trim().to_string())
        .filter(|s| is_plausible_url(s))
        .ok_or(MalformedRecord::InvalidUrl)?;

    let description = first_str(raw, &["description", "summary", "abstract"])
        .map(|s| normalize_text(&s))
        .unwrap_or_default();

    let details = match source {
        SourceKind::Repository => SourceDetails::Repository {
            stars: first_count(raw, &["stars", "stargazers_count", "stargazers"]),
            stars_today: first_count(raw, &["stars_today", "stars_period", "current_period_stars"]),
            forks: first_count(raw, &["forks", "forks_count"]),
            language: first_str(raw, &["language", "primary_language"])
                .map(|s| normalize_text(&s))
                .filter(|s| !s.is_empty()),
            topics: topics(raw),
        },
        SourceKind::Collection => SourceDetails::Collection {
            item_count: first_count(raw, &["item_count", "items", "items_count"]),
        },
        SourceKind::Paper => SourceDetails::Paper {
            upvotes: first_count(raw, &["upvotes", "votes"]),
        },
        SourceKind::Space => SourceDetails::Space {
            likes: first_count(raw, &["likes", "hearts"]),
            sdk: first_str(raw, &["sdk"])
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        },
    };

    let published_at = ["published_at", "published_date", "created_at", "seen_at", "date"]
        .iter()
        .filter_map(|k| raw.get(*k))
        .find_map(parse_timestamp);

    Ok(TrendingItem {
        name,
        description,
        url,
        details,
        published_at,
        score: None,
        ai_summary: None,
        ai_trending_reason: None,
    })
}

/// Normalize a batch, dropping (and logging) malformed records.
/// Returns the converted items plus the number dropped.
pub fn normalize_batch(
    records: Vec<(Option<SourceKind>, RawRecord)>,
) -> (Vec<TrendingItem>, usize) {
    let mut out = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for (default_source, raw) in records {
        match normalize_record(&raw, default_source) {
            Ok(item) => out.push(item),
            Err(reason) => {
                dropped += 1;
                tracing::warn!(
                    target: "ingest",
                    %reason,
                    name = raw.get("name").and_then(serde_json::Value::as_str).unwrap_or("<none>"),
                    "dropping malformed record"
                );
            }
        }
    }
    (out, dropped)
}

fn is_plausible_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    let host = ["https://", "http://"]
        .iter()
        .find_map(|scheme| lower.strip_prefix(scheme));
    host.is_some_and(|rest| !rest.is_empty()) && !s.contains(char::is_whitespace)
}

fn first_str(raw: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn first_count(raw: &RawRecord, keys: &[&str]) -> u64 {
    keys.iter()
        .filter_map(|k| raw.get(*k))
        .find_map(coerce_count)
        .unwrap_or(0)
}

/// Coerce a JSON value into a non-negative count. Accepts numbers and strings
/// such as `"12,345"`, `"1.2k"`, `"3M"`, `"+87"`.
pub fn coerce_count(v: &Value) -> Option<u64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_count_str(s)?,
        _ => return None,
    };
    if f.is_finite() && f >= 0.0 {
        Some(f.round() as u64)
    } else {
        None
    }
}

fn parse_count_str(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    let (num, mult) = match cleaned.chars().last()? {
        'k' | 'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'm' | 'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    num.parse::<f64>().ok().map(|n| n * mult)
}

fn topics(raw: &RawRecord) -> Vec<String> {
    let mut out: Vec<String> = match raw.get("topics") {
        Some(Value::Array(xs)) => xs
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        Some(Value::String(s)) => s.split(',').map(|t| t.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    out.retain(|t| !t.is_empty());
    out.truncate(MAX_TOPICS);
    out
}

/// RFC 3339 strings, bare `YYYY-MM-DD` dates (midnight UTC), or unix seconds.
pub fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}
