//! `/api/v1/displays`

use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use roomctl_core::{DeviceInfo, ModuleKind};
use roomctl_hardware::DeviceModule;
use roomctl_hardware::modules::DisplayModule;
use roomctl_hardware::types::DeviceStatus;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{device_list, module};
use crate::error::{ApiJson, ApiResult, ok, whole_number};
use crate::state::AppState;

const KIND: ModuleKind = ModuleKind::Display;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(status))
        .route("/{id}/brightness", get(brightness).put(set_brightness))
        .route("/{id}/power", put(set_power))
}

#[derive(Debug, Serialize)]
struct Brightness {
    brightness: i32,
}

#[derive(Debug, Deserialize)]
struct SetBrightness {
    brightness: Number,
}

#[derive(Debug, Serialize, Deserialize)]
struct Power {
    on: bool,
}

async fn list(State(state): State<AppState>) -> ApiResult<Vec<DeviceInfo>> {
    device_list(&*module::<DisplayModule>(&state, KIND)?)
}

async fn status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeviceStatus> {
    let displays = module::<DisplayModule>(&state, KIND)?;
    ok(displays.device_status(&id).await?)
}

async fn brightness(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Brightness> {
    let displays = module::<DisplayModule>(&state, KIND)?;
    let level = displays.brightness(&id).await?;
    ok(Brightness {
        brightness: level.into(),
    })
}

async fn set_brightness(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SetBrightness>,
) -> ApiResult<Brightness> {
    let brightness = whole_number("brightness", &body.brightness)?;
    let displays = module::<DisplayModule>(&state, KIND)?;
    displays.set_brightness(&id, brightness).await?;
    ok(Brightness { brightness })
}

async fn set_power(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Power>,
) -> ApiResult<Power> {
    let displays = module::<DisplayModule>(&state, KIND)?;
    displays.set_power(&id, body.on).await?;
    ok(body)
}
