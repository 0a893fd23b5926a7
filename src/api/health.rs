/// Health check and metrics endpoints
///
/// - Liveness: `/health` answers as long as the process serves HTTP
/// - Readiness: `/health/ready` also requires the cache backend to answer a ping
use crate::{context::AppContext, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(metrics_endpoint))
}

/// Basic health check
pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe
///
/// Lookups still succeed without a cache, but every one of them then goes to
/// the providers, so a dead cache takes the instance out of rotation.
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = ctx.cache_store();

    if let Err(e) = store.ping().await {
        tracing::warn!(error = %e, backend = store.backend_name(), "readiness_probe_failed: cache check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "cache": store.backend_name(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

/// Prometheus exposition
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
