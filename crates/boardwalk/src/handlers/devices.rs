// ── Local device registry handlers ──
//
// Plain CRUD against the in-process store. Nothing here talks to
// ThingsBoard.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::Device;

/// Create/update payload. The name is the only caller-writable field.
#[derive(Debug, Deserialize)]
pub struct DevicePayload {
    pub name: String,
}

impl DevicePayload {
    /// Trimmed name, rejecting blank input.
    fn validated(self) -> Result<String, ApiError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        Ok(name.to_owned())
    }
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<Device>> {
    Json(state.devices.list())
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<DevicePayload>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let device = state.devices.insert(payload.validated()?);
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Device>, ApiError> {
    state.devices.get(id).map(Json).ok_or(ApiError::NotFound(id))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DevicePayload>,
) -> Result<Json<Device>, ApiError> {
    let name = payload.validated()?;
    state
        .devices
        .rename(id, name)
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .devices
        .remove(id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(ApiError::NotFound(id))
}
