// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use ai_trends_aggregator::config::ScoringConfig;
use ai_trends_aggregator::enrich::{Enricher, MockGenerator};
use ai_trends_aggregator::ingest::providers::JsonFeedFetcher;
use ai_trends_aggregator::ingest::types::{RawRecord, SourceFetcher};
use ai_trends_aggregator::{api, Aggregator, AppState, SourceKind, TimeRange};
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    Router,
};
use http::{Request, StatusCode};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

const BODY_LIMIT: usize = 4 * 1024 * 1024;

struct Down;

#[async_trait]
impl SourceFetcher for Down {
    async fn fetch_items(&self, _range: TimeRange) -> anyhow::Result<Vec<RawRecord>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &str {
        "github"
    }
}

fn spaces_feed(n: usize) -> Arc<dyn SourceFetcher> {
    let records: Vec<Json> = (0..n)
        .map(|i| {
            json!({
                "name": format!("team/space-{i}"),
                "url": format!("https://huggingface.co/spaces/team/space-{i}"),
                "description": format!("demo {i}"),
                "likes": i * 3,
            })
        })
        .collect();
    Arc::new(JsonFeedFetcher::from_body(
        "hf_spaces",
        Some(SourceKind::Space),
        &Json::Array(records).to_string(),
    ))
}

fn papers_feed() -> Arc<dyn SourceFetcher> {
    Arc::new(JsonFeedFetcher::from_body(
        "hf_papers",
        None,
        r#"[{"source": "paper", "title": "Tiny Recursive Models", "link": "https://hf.co/papers/2510.1", "upvotes": 120}]"#,
    ))
}

fn test_router(fetchers: Vec<Arc<dyn SourceFetcher>>) -> Router {
    let state = AppState {
        aggregator: Arc::new(Aggregator::new(fetchers, ScoringConfig::default())),
        enricher: Arc::new(Enricher::new(Arc::new(MockGenerator::default())).with_max_workers(4)),
    };
    api::create_router(state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let body: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = get_json(test_router(vec![]), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn root_lists_endpoints() {
    let (status, body) = get_json(test_router(vec![]), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["news"], "/api/news?range=daily&limit=30");
}

#[tokio::test]
async fn news_clamps_oversized_limit() {
    let app = test_router(vec![spaces_feed(150), papers_feed()]);
    let (status, body) = get_json(app, "/api/news?range=weekly&limit=500").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["time_range"], "weekly");
    assert_eq!(body["total_items"], 151);
    assert_eq!(body["returned_items"], 100);
    assert_eq!(body["data"]["all_items"].as_array().unwrap().len(), 100);
    assert_eq!(body["enriched"], false);

    // Highest score first: the paper (120 upvotes * 3) outranks every space.
    assert_eq!(body["data"]["all_items"][0]["source"], "paper");
    assert_eq!(body["stats"]["papers_count"], 1);
    assert_eq!(body["stats"]["spaces_count"], 99);
}

#[tokio::test]
async fn news_with_enrich_fills_ai_fields() {
    let app = test_router(vec![spaces_feed(3), papers_feed()]);
    let (status, body) = get_json(app, "/api/news?limit=4&enrich=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enriched"], true);
    let items = body["data"]["all_items"].as_array().unwrap();
    assert_eq!(items.len(), 4);
    for item in items {
        assert!(item["ai_summary"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(item["ai_trending_reason"].as_str().is_some_and(|s| !s.is_empty()));
    }
    let scores: Vec<f64> = items.iter().map(|i| i["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn unknown_range_is_a_bad_request() {
    let app = test_router(vec![papers_feed()]);
    let (status, body) = get_json(app, "/api/news?range=hourly").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn malformed_query_values_are_structured_bad_requests() {
    for uri in [
        "/api/news?limit=abc",
        "/api/news?limit=-5",
        "/api/news?enrich=yes",
        "/api/news/spaces?limit=lots",
    ] {
        let app = test_router(vec![papers_feed()]);
        let (status, body) = get_json(app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false, "{uri}");
        assert_eq!(body["data"], json!([]), "{uri}");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{uri}");
    }
}

#[tokio::test]
async fn all_fetchers_down_is_a_structured_500() {
    let app = test_router(vec![Arc::new(Down) as Arc<dyn SourceFetcher>]);
    let (status, body) = get_json(app, "/api/news").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No items found");
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["failed_sources"], json!(["github"]));
}

#[tokio::test]
async fn per_source_listing_only_returns_that_source() {
    let app = test_router(vec![spaces_feed(5), papers_feed()]);
    let (status, body) = get_json(app, "/api/news/papers?range=monthly").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "paper");
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Tiny Recursive Models");
}

#[tokio::test]
async fn unknown_path_is_json_404() {
    let (status, body) = get_json(test_router(vec![]), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["available_endpoints"].is_object());
}
