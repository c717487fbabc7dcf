//! Operational analytics endpoints

use crate::bootstrap::{AppState, SERVICE_NAME};
use aegis_cache::{CacheHealth, CombinedStats};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

/// `GET /api/v1/analytics/cache`
pub async fn cache_stats(State(state): State<AppState>) -> Json<CombinedStats> {
    Json(state.pipeline.cache().stats())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PiiAnalytics {
    pub total_detections: i64,
    pub detections_last_24h: i64,
    pub counts_by_kind: Vec<KindCount>,
}

#[derive(Debug, Serialize)]
pub struct KindCount {
    pub kind: String,
    pub count: i64,
}

/// `GET /api/v1/analytics/pii`
pub async fn pii_stats(State(state): State<AppState>) -> Response {
    let store = &state.audit_store;
    let total = store.total_count().await;
    let recent = store.count_since(Utc::now() - Duration::hours(24)).await;
    let by_kind = store.counts_by_kind().await;

    match (total, recent, by_kind) {
        (Ok(total_detections), Ok(detections_last_24h), Ok(counts)) => Json(PiiAnalytics {
            total_detections,
            detections_last_24h,
            counts_by_kind: counts
                .into_iter()
                .map(|(kind, count)| KindCount { kind, count })
                .collect(),
        })
        .into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "audit store unavailable" })),
        )
            .into_response(),
    }
}

/// `GET /api/v1/analytics/models`
pub async fn models(State(state): State<AppState>) -> Response {
    let profiles: Vec<_> = state.registry.all().into_iter().cloned().collect();
    Json(profiles).into_response()
}

/// `GET /api/v1/analytics/summary`
pub async fn summary(State(state): State<AppState>) -> Response {
    let cache = state.pipeline.cache().stats();
    let audit_total = state.audit_store.total_count().await.unwrap_or(-1);

    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "cache": cache,
        "audit": { "totalDetections": audit_total },
        "models": state.registry.enabled().len(),
    }))
    .into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub cache: CacheHealth,
    pub audit_ok: bool,
}

/// `GET /api/v1/analytics/health`
pub async fn health(State(state): State<AppState>) -> Json<SystemHealth> {
    let cache = state.pipeline.cache().health().await;
    let audit_ok = state.audit_store.total_count().await.is_ok();
    Json(SystemHealth { cache, audit_ok })
}

/// `POST /api/v1/analytics/cache/clear`
pub async fn clear_cache(State(state): State<AppState>) -> Response {
    state.pipeline.cache().clear().await;
    info!("Cache cleared by operator request");
    Json(json!({ "cleared": true })).into_response()
}
