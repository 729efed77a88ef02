// ── HTTP surface ──

pub mod devices;
pub mod wrapper;

use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Largest inbound body the service will buffer (10 MiB).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/devices", get(devices::list).post(devices::create))
        .route(
            "/api/devices/{id}",
            get(devices::fetch)
                .put(devices::update)
                .patch(devices::update)
                .delete(devices::remove),
        )
        .route("/api/wrapper/devices", get(wrapper::tenant_devices))
        .route(
            "/api/wrapper/devices/{device_id}/telemetry/latest",
            get(wrapper::latest_telemetry),
        )
        .route("/api/wrapper/proxy/{*path}", any(wrapper::relay))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
