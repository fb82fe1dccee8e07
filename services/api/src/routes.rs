use crate::infra::AppState;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use kyp_review::workflows::catalog::{CatalogProductView, CatalogSummary};
use kyp_review::workflows::kyp::{
    review_router, KypReviewService, ReviewEventPublisher, ReviewSessionRepository,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, PoisonError};
use tracing::debug;

#[derive(Debug, Serialize)]
pub(crate) struct CatalogResponse {
    pub(crate) summary: CatalogSummary,
    pub(crate) products: Vec<CatalogProductView>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CatalogQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
}

pub(crate) fn with_review_routes<R, P>(service: Arc<KypReviewService<R, P>>) -> axum::Router
where
    R: ReviewSessionRepository + 'static,
    P: ReviewEventPublisher + 'static,
{
    review_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/kyp/catalog", axum::routing::get(catalog_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Applies pending review events to the status board, then lists products with their status.
/// `?q=` narrows the listing by code, name, or provider; the summary always covers the catalog.
pub(crate) async fn catalog_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<CatalogResponse> {
    let pending = state.events.drain();
    let mut board = state.board.lock().unwrap_or_else(PoisonError::into_inner);
    let applied = board.apply_all(&pending);
    if applied > 0 {
        debug!(applied, "review events applied to catalog");
    }

    Json(CatalogResponse {
        summary: board.summary(&state.catalog),
        products: match query.q.as_deref() {
            Some(q) => board.search(&state.catalog, q),
            None => board.listing(&state.catalog),
        },
    })
}
