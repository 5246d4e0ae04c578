//! `/api/v1/cameras`

use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use roomctl_core::{DeviceInfo, ModuleKind};
use roomctl_hardware::DeviceModule;
use roomctl_hardware::modules::CameraModule;
use roomctl_hardware::types::{DeviceStatus, Ptz};
use serde::{Deserialize, Serialize};

use super::{device_list, module};
use crate::error::{ApiJson, ApiResult, ok};
use crate::state::AppState;

const KIND: ModuleKind = ModuleKind::Camera;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(status))
        .route("/{id}/ptz", get(ptz).put(set_ptz))
        .route(
            "/{id}/autoframing",
            get(auto_framing).put(set_auto_framing),
        )
        .route("/{id}/home", post(home))
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct AutoFraming {
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SetAutoFraming {
    pub enabled: bool,
}

async fn list(State(state): State<AppState>) -> ApiResult<Vec<DeviceInfo>> {
    device_list(&*module::<CameraModule>(&state, KIND)?)
}

async fn status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeviceStatus> {
    let cameras = module::<CameraModule>(&state, KIND)?;
    ok(cameras.device_status(&id).await?)
}

async fn ptz(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Ptz> {
    let cameras = module::<CameraModule>(&state, KIND)?;
    ok(cameras.ptz(&id).await?)
}

async fn set_ptz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Ptz>,
) -> ApiResult<Ptz> {
    let cameras = module::<CameraModule>(&state, KIND)?;
    cameras.set_ptz(&id, body.pan, body.tilt, body.zoom).await?;
    ok(body)
}

/// Last value set through this controller; `null` until then.
async fn auto_framing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AutoFraming> {
    let cameras = module::<CameraModule>(&state, KIND)?;
    let enabled = cameras.auto_framing(&id).await?;
    ok(AutoFraming { enabled })
}

async fn set_auto_framing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SetAutoFraming>,
) -> ApiResult<AutoFraming> {
    let cameras = module::<CameraModule>(&state, KIND)?;
    cameras.set_auto_framing(&id, body.enabled).await?;
    ok(AutoFraming {
        enabled: Some(body.enabled),
    })
}

async fn home(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Ptz> {
    let cameras = module::<CameraModule>(&state, KIND)?;
    cameras.home(&id).await?;
    ok(Ptz::HOME)
}
