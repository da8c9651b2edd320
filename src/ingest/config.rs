// src/ingest/config.rs
//! Fetcher list, loaded from TOML or JSON.
//!
//! ```toml
//! [[fetchers]]
//! name = "github-trending"
//! kind = "http"          # or "file"
//! location = "https://feeds.example.test/github.json"
//! source = "repository"  # optional default tag
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::providers::JsonFeedFetcher;
use crate::ingest::types::SourceFetcher;
use crate::model::SourceKind;

const ENV_PATH: &str = "SOURCES_CONFIG_PATH";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    File,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetcherSpec {
    pub name: String,
    pub kind: FetcherKind,
    pub location: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    fetchers: Vec<FetcherSpec>,
}

/// Load fetcher specs from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<FetcherSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load fetcher specs using env var + fallbacks:
/// 1) $SOURCES_CONFIG_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<FetcherSpec>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("SOURCES_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<FetcherSpec>> {
    let specs = if hint_ext == "json" || s.trim_start().starts_with(['{', '[']) {
        parse_json(s)?
    } else {
        let f: SourcesFile = toml::from_str(s).context("parsing sources toml")?;
        f.fetchers
    };
    validate(specs)
}

fn parse_json(s: &str) -> Result<Vec<FetcherSpec>> {
    // Either {"fetchers": [...]} or a bare array.
    if let Ok(f) = serde_json::from_str::<SourcesFile>(s) {
        return Ok(f.fetchers);
    }
    serde_json::from_str::<Vec<FetcherSpec>>(s).context("parsing sources json")
}

fn validate(specs: Vec<FetcherSpec>) -> Result<Vec<FetcherSpec>> {
    let mut seen = std::collections::HashSet::new();
    for spec in &specs {
        if spec.name.trim().is_empty() {
            return Err(anyhow!("fetcher with empty name"));
        }
        if !seen.insert(spec.name.clone()) {
            return Err(anyhow!("duplicate fetcher name '{}'", spec.name));
        }
        if let Some(tag) = &spec.source {
            if SourceKind::from_tag(tag).is_none() {
                return Err(anyhow!("fetcher '{}': unknown source '{tag}'", spec.name));
            }
        }
    }
    Ok(specs)
}

/// Instantiate the configured fetchers.
pub fn build_fetchers(specs: &[FetcherSpec]) -> Result<Vec<Arc<dyn SourceFetcher>>> {
    specs
        .iter()
        .map(|spec| {
            let source = spec.source.as_deref().and_then(SourceKind::from_tag);
            let fetcher: Arc<dyn SourceFetcher> = match spec.kind {
                FetcherKind::File => Arc::new(JsonFeedFetcher::from_file(
                    spec.name.clone(),
                    source,
                    &spec.location,
                )),
                FetcherKind::Http => Arc::new(JsonFeedFetcher::from_url(
                    spec.name.clone(),
                    source,
                    spec.location.clone(),
                    Duration::from_secs(spec.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)),
                )?),
            };
            Ok(fetcher)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    const TOML: &str = r#"
        [[fetchers]]
        name = "papers"
        kind = "file"
        location = "fixtures/papers.json"
        source = "paper"

        [[fetchers]]
        name = "repos"
        kind = "http"
        location = "https://feeds.example.test/repos.json"
    "#;

    #[test]
    fn toml_and_json_formats_work() {
        let t = parse_sources(TOML, "toml").unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].kind, FetcherKind::File);
        assert_eq!(t[1].source, None);

        let j = parse_sources(
            r#"[{"name":"spaces","kind":"file","location":"s.json","source":"space"}]"#,
            "json",
        )
        .unwrap();
        assert_eq!(j[0].name, "spaces");

        let wrapped = parse_sources(r#"{"fetchers": []}"#, "").unwrap();
        assert!(wrapped.is_empty());
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let dup = r#"[{"name":"a","kind":"file","location":"x"},{"name":"a","kind":"file","location":"y"}]"#;
        assert!(parse_sources(dup, "json").is_err());
        let bad_source = r#"[{"name":"a","kind":"file","location":"x","source":"tweets"}]"#;
        assert!(parse_sources(bad_source, "json").is_err());
    }

    #[test]
    fn builds_one_fetcher_per_spec() {
        let specs = parse_sources(TOML, "toml").unwrap();
        let fetchers = build_fetchers(&specs).unwrap();
        let names: Vec<_> = fetchers.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["papers", "repos"]);
        assert_eq!(fetchers[0].default_source(), Some(SourceKind::Paper));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD in a temp dir so the repo's config/ does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_PATH);
        assert!(load_sources_default().unwrap().is_empty());

        let p = tmp.path().join("sources.toml");
        fs::write(&p, TOML).unwrap();
        env::set_var(ENV_PATH, p.display().to_string());
        assert_eq!(load_sources_default().unwrap().len(), 2);
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
