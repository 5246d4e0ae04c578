//! `/api/v1/audio`, `/api/v1/microphones` and `/api/v1/speakers`.
//!
//! The three prefixes share these handlers; the nested router carries its
//! [`ModuleKind`] as an extension.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Router};
use roomctl_core::{DeviceInfo, Error, ModuleKind};
use roomctl_hardware::DeviceModule;
use roomctl_hardware::modules::AudioModule;
use roomctl_hardware::types::DeviceStatus;
use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::device_list;
use crate::error::{ApiError, ApiJson, ApiResult, ok, optional_body, whole_number};
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(status))
        .route("/{id}/volume", get(volume).put(set_volume))
        .route("/{id}/volume/up", post(volume_up))
        .route("/{id}/volume/down", post(volume_down))
        .route("/{id}/mute", get(mute).put(set_mute))
        .route("/{id}/presets/{name}", post(apply_preset))
}

#[derive(Debug, Serialize)]
struct Volume {
    volume: i32,
}

#[derive(Debug, Deserialize)]
struct SetVolume {
    volume: Number,
}

#[derive(Debug, Serialize, Deserialize)]
struct Mute {
    muted: bool,
}

#[derive(Debug, Deserialize)]
struct Step {
    step: Option<Number>,
}

/// The optional `{"step": n}` body of the volume nudges.
fn parse_step(body: &[u8]) -> Result<Option<i32>, ApiError> {
    optional_body::<Step>(body)?
        .and_then(|b| b.step)
        .map(|n| whole_number("step", &n))
        .transpose()
}

fn audio(state: &AppState, kind: ModuleKind) -> Result<Arc<AudioModule>, ApiError> {
    state
        .manager
        .audio(kind)
        .ok_or_else(|| Error::ModuleUnavailable(kind).into())
}

async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
) -> ApiResult<Vec<DeviceInfo>> {
    device_list(&*audio(&state, kind)?)
}

async fn status(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path(id): Path<String>,
) -> ApiResult<DeviceStatus> {
    ok(audio(&state, kind)?.device_status(&id).await?)
}

async fn volume(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path(id): Path<String>,
) -> ApiResult<Volume> {
    let level = audio(&state, kind)?.volume(&id).await?;
    ok(Volume {
        volume: level.into(),
    })
}

async fn set_volume(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SetVolume>,
) -> ApiResult<Volume> {
    let volume = whole_number("volume", &body.volume)?;
    audio(&state, kind)?.set_volume(&id, volume).await?;
    ok(Volume { volume })
}

async fn volume_up(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Volume> {
    let step = parse_step(&body)?;
    let level = audio(&state, kind)?.volume_up(&id, step).await?;
    ok(Volume {
        volume: level.into(),
    })
}

async fn volume_down(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Volume> {
    let step = parse_step(&body)?;
    let level = audio(&state, kind)?.volume_down(&id, step).await?;
    ok(Volume {
        volume: level.into(),
    })
}

async fn mute(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path(id): Path<String>,
) -> ApiResult<Mute> {
    let muted = audio(&state, kind)?.mute(&id).await?;
    ok(Mute { muted })
}

async fn set_mute(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Mute>,
) -> ApiResult<Mute> {
    audio(&state, kind)?.set_mute(&id, body.muted).await?;
    ok(body)
}

async fn apply_preset(
    State(state): State<AppState>,
    Extension(kind): Extension<ModuleKind>,
    Path((id, name)): Path<(String, String)>,
) -> ApiResult<Volume> {
    let level = audio(&state, kind)?.apply_preset(&id, &name).await?;
    ok(Volume {
        volume: level.into(),
    })
}
