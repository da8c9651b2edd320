// src/api.rs
//! HTTP surface over the aggregator and the enricher.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::enrich::Enricher;
use crate::ingest::Aggregator;
use crate::model::{RankedBatch, SourceKind, TimeRange};
use crate::rank::{group_by_source, select_top};
use crate::report::{FailureResponse, NewsResponse, SourceListResponse};

pub const SERVICE_NAME: &str = "AI Trends Aggregator API";
pub const DEFAULT_LIMIT: usize = 30;
pub const MAX_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub enricher: Arc<Enricher>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/api", get(service_info))
        .route("/api/health", get(health))
        .route("/api/news", get(news))
        .route("/api/news/repos", get(repos))
        .route("/api/news/papers", get(papers))
        .route("/api/news/spaces", get(spaces))
        .route("/api/news/collections", get(collections))
        .fallback(not_found)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Requested limit, capped at [`MAX_LIMIT`].
pub fn clamp_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub enrich: Option<bool>,
}

fn endpoints() -> serde_json::Value {
    json!({
        "health": "/api/health",
        "news": "/api/news?range=daily&limit=30",
        "repos": "/api/news/repos",
        "papers": "/api/news/papers",
        "spaces": "/api/news/spaces",
        "collections": "/api/news/collections",
    })
}

async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": endpoints(),
        "timestamp": Utc::now(),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": Utc::now(),
    }))
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "Endpoint not found",
            "message": "The requested URL was not found on this server",
            "available_endpoints": endpoints(),
        })),
    )
        .into_response()
}

/// Malformed query strings (`limit=abc`, `enrich=yes`) get the JSON failure shape.
fn parse_query(query: Result<Query<NewsQuery>, QueryRejection>) -> Result<NewsQuery, Response> {
    query.map(|Query(q)| q).map_err(|rejection| {
        failure(
            StatusCode::BAD_REQUEST,
            FailureResponse::new(rejection.body_text()),
        )
    })
}

fn parse_range(raw: Option<&str>) -> Result<TimeRange, Response> {
    match raw {
        None => Ok(TimeRange::default()),
        Some(s) => s.parse::<TimeRange>().map_err(|e| {
            (StatusCode::BAD_REQUEST, Json(FailureResponse::new(e.to_string()))).into_response()
        }),
    }
}

fn failure(status: StatusCode, body: FailureResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Enrich the selected items and restore score order.
async fn enrich_batch(enricher: &Enricher, batch: RankedBatch) -> RankedBatch {
    if batch.items.is_empty() {
        return batch;
    }
    let n = batch.items.len();
    match enricher.enrich_items(batch.items.clone()).await {
        Ok(items) => {
            let items = select_top(items, n);
            let grouped = group_by_source(&items);
            RankedBatch {
                items,
                grouped,
                ..batch
            }
        }
        Err(e) => {
            tracing::warn!(target: "api", error = %e, "enrichment skipped");
            batch
        }
    }
}

async fn news(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Response {
    let q = match parse_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let range = match parse_range(q.range.as_deref()) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let limit = clamp_limit(q.limit);
    let enrich = q.enrich.unwrap_or(false);

    match state.aggregator.run(range, limit).await {
        Ok(batch) => {
            let batch = if enrich {
                enrich_batch(&state.enricher, batch).await
            } else {
                batch
            };
            Json(NewsResponse::from_batch(batch, range, Utc::now(), enrich)).into_response()
        }
        Err(err) => {
            tracing::warn!(target: "api", error = %err, %range, "aggregation failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, err.into())
        }
    }
}

async fn source_listing(
    state: AppState,
    query: Result<Query<NewsQuery>, QueryRejection>,
    kind: SourceKind,
) -> Response {
    let q = match parse_query(query) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let range = match parse_range(q.range.as_deref()) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match state.aggregator.run(range, clamp_limit(q.limit)).await {
        Ok(mut batch) => {
            let data = batch.grouped.remove(&kind).unwrap_or_default();
            Json(SourceListResponse {
                success: true,
                timestamp: Utc::now(),
                source: kind,
                count: data.len(),
                data,
            })
            .into_response()
        }
        Err(err) => failure(StatusCode::INTERNAL_SERVER_ERROR, err.into()),
    }
}

async fn repos(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Response {
    source_listing(state, query, SourceKind::Repository).await
}

async fn papers(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Response {
    source_listing(state, query, SourceKind::Paper).await
}

async fn spaces(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Response {
    source_listing(state, query, SourceKind::Space).await
}

async fn collections(
    State(state): State<AppState>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Response {
    source_listing(state, query, SourceKind::Collection).await
}
