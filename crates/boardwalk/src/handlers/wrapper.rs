// ── Upstream-facing handlers ──
//
// The typed wrappers reshape ThingsBoard responses into a stable local
// envelope; the generic relay passes responses through with the
// upstream status verbatim. Both fail as `{"detail": ...}` through
// `ApiError` (502 when the upstream is the problem, 500 otherwise).

use axum::Json;
use axum::extract::{Path, Query, RawQuery, Request, State};
use axum::response::{IntoResponse, Response};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use boardwalk_api::{LatestValue, ProxyResponse, ResponseBody, collapse_query};

use crate::error::ApiError;
use crate::state::AppState;

// ── Tenant device list ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page_size", rename = "pageSize")]
    page_size: u64,
    #[serde(default)]
    page: u64,
}

fn default_page_size() -> u64 {
    100
}

/// Local paging envelope. Device entries stay opaque JSON; the echoed
/// paging values are the effective ones after defaulting.
#[derive(Debug, Serialize)]
pub struct DeviceListEnvelope {
    data: Vec<Value>,
    #[serde(rename = "totalElements")]
    total_elements: i64,
    #[serde(rename = "pageSize")]
    page_size: u64,
    page: u64,
}

/// `GET /api/wrapper/devices`
pub async fn tenant_devices(
    State(state): State<AppState>,
    Query(paging): Query<PageQuery>,
) -> Result<Json<DeviceListEnvelope>, ApiError> {
    let page = state
        .upstream
        .tenant_devices(paging.page_size, paging.page)
        .await?;

    Ok(Json(DeviceListEnvelope {
        data: page.data,
        total_elements: page.total_elements,
        page_size: paging.page_size,
        page: paging.page,
    }))
}

// ── Latest telemetry ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct KeysQuery {
    keys: Option<String>,
}

/// Latest-value snapshot for one device, keyed by telemetry name in
/// upstream order.
#[derive(Debug, Serialize)]
pub struct TelemetryEnvelope {
    device_id: String,
    latest_telemetry: IndexMap<String, LatestValue>,
}

/// `GET /api/wrapper/devices/{device_id}/telemetry/latest`
pub async fn latest_telemetry(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<TelemetryEnvelope>, ApiError> {
    let latest = state
        .upstream
        .latest_telemetry(&device_id, query.keys.as_deref())
        .await?;

    Ok(Json(TelemetryEnvelope {
        device_id,
        latest_telemetry: latest,
    }))
}

// ── Generic relay ───────────────────────────────────────────────────

/// `ANY /api/wrapper/proxy/{*path}`
///
/// The wildcard tail is the upstream path. Upstream error statuses are
/// relayed as-is; only transport and translation failures become local
/// errors.
pub async fn relay(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(raw_query): RawQuery,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(ApiError::BodyRead)?;

    let query = collapse_query(raw_query.as_deref());
    let outbound = state
        .upstream
        .translate(parts.method.as_str(), &path, query, &parts.headers, &bytes)?;
    let relayed = state.upstream.forward(outbound).await?;

    Ok(proxied_response(relayed))
}

/// Rebuild an axum response from the relayed parts. The relayed header
/// set replaces whatever the body renderer added.
fn proxied_response(relayed: ProxyResponse) -> Response {
    let ProxyResponse {
        status,
        headers,
        body,
    } = relayed;

    let mut response = match body {
        ResponseBody::Json(value) => Json(value).into_response(),
        ResponseBody::Text(text) => text.into_response(),
    };
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
