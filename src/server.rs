use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, info};
use serde::Serialize;
use tokio::sync::watch;

use crate::metrics::SnapshotCache;
use crate::output::render_exposition;
use crate::scheduler::SchedulerState;

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
struct AppState {
    cache: Arc<SnapshotCache>,
    scheduler: watch::Receiver<SchedulerState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthReport {
    status: &'static str,
    scheduler: &'static str,
    last_refresh: Option<chrono::DateTime<chrono::Utc>>,
    metric_count: usize,
}

/// `GET /metrics`: the current snapshot, one line per metric.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.cache.get_metrics();
    debug!("Serving {} metrics", metrics.len());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        render_exposition(&metrics),
    )
}

/// `GET /health`: liveness, scheduler phase, and the age and size of the
/// current snapshot.
async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    let snapshot = state.cache.read();
    let phase = state.scheduler.borrow().phase();
    Json(HealthReport {
        status: "ok",
        scheduler: phase,
        last_refresh: snapshot.as_ref().map(|s| s.captured_at()),
        metric_count: snapshot.as_ref().map_or(0, |s| s.len()),
    })
}

pub fn build_router(
    cache: Arc<SnapshotCache>,
    scheduler: watch::Receiver<SchedulerState>,
) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { cache, scheduler })
}

/// Serves the router until `shutdown` fires.
pub async fn serve(
    addr: SocketAddr,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting server on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
}
