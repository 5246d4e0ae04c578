//! `/api/v1/lighting`

use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use roomctl_core::{DeviceInfo, ModuleKind};
use roomctl_hardware::DeviceModule;
use roomctl_hardware::modules::LightingModule;
use roomctl_hardware::types::{DeviceStatus, Rgbw};
use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{device_list, module};
use crate::error::{ApiError, ApiJson, ApiResult, ok, whole_number};
use crate::state::AppState;

const KIND: ModuleKind = ModuleKind::Lighting;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/blackout", post(blackout))
        .route("/{id}", get(status))
        .route("/{id}/color", get(color).put(set_color))
        .route("/{id}/brightness", get(brightness).put(set_brightness))
}

#[derive(Debug, Serialize)]
struct Color {
    red: i32,
    green: i32,
    blue: i32,
    white: i32,
}

/// Channel values as sent; range checks happen in the module.
#[derive(Debug, Deserialize)]
struct SetColor {
    red: Number,
    green: Number,
    blue: Number,
    white: Number,
}

impl TryFrom<SetColor> for Color {
    type Error = ApiError;

    fn try_from(body: SetColor) -> Result<Self, ApiError> {
        Ok(Self {
            red: whole_number("red", &body.red)?,
            green: whole_number("green", &body.green)?,
            blue: whole_number("blue", &body.blue)?,
            white: whole_number("white", &body.white)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct Brightness {
    brightness: i32,
}

#[derive(Debug, Deserialize)]
struct SetBrightness {
    brightness: Number,
}

#[derive(Debug, Serialize)]
struct Blackout {
    fixtures: usize,
}

async fn list(State(state): State<AppState>) -> ApiResult<Vec<DeviceInfo>> {
    device_list(&*module::<LightingModule>(&state, KIND)?)
}

async fn status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeviceStatus> {
    let lighting = module::<LightingModule>(&state, KIND)?;
    ok(lighting.device_status(&id).await?)
}

async fn color(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Rgbw> {
    let lighting = module::<LightingModule>(&state, KIND)?;
    ok(lighting.color(&id).await?)
}

async fn set_color(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SetColor>,
) -> ApiResult<Color> {
    let color = Color::try_from(body)?;
    let lighting = module::<LightingModule>(&state, KIND)?;
    lighting
        .set_color(&id, color.red, color.green, color.blue, color.white)
        .await?;
    ok(color)
}

async fn brightness(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Brightness> {
    let lighting = module::<LightingModule>(&state, KIND)?;
    let level = lighting.brightness(&id).await?;
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
    let lighting = module::<LightingModule>(&state, KIND)?;
    lighting.set_brightness(&id, brightness).await?;
    ok(Brightness { brightness })
}

async fn blackout(State(state): State<AppState>) -> ApiResult<Blackout> {
    let lighting = module::<LightingModule>(&state, KIND)?;
    let fixtures = lighting.blackout().await?;
    ok(Blackout { fixtures })
}
