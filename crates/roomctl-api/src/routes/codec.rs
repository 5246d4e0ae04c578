//! `/api/v1/biamp`

use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use roomctl_core::{DeviceInfo, ModuleKind};
use roomctl_hardware::DeviceModule;
use roomctl_hardware::modules::CodecModule;
use roomctl_hardware::types::{DeviceStatus, Ptz};
use serde::Serialize;

use super::camera::{AutoFraming, SetAutoFraming};
use super::{device_list, module};
use crate::error::{ApiJson, ApiResult, ok};
use crate::state::AppState;

const KIND: ModuleKind = ModuleKind::Codec;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(status))
        .route("/{id}/ptz", get(ptz).put(set_ptz))
        .route(
            "/{id}/autoframing",
            get(auto_framing).put(set_auto_framing),
        )
        .route("/{id}/reboot", post(reboot))
}

#[derive(Debug, Serialize)]
struct Reboot {
    rebooting: bool,
}

async fn list(State(state): State<AppState>) -> ApiResult<Vec<DeviceInfo>> {
    device_list(&*module::<CodecModule>(&state, KIND)?)
}

async fn status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<DeviceStatus> {
    let codecs = module::<CodecModule>(&state, KIND)?;
    ok(codecs.device_status(&id).await?)
}

async fn ptz(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Ptz> {
    let codecs = module::<CodecModule>(&state, KIND)?;
    ok(codecs.ptz(&id).await?)
}

async fn set_ptz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Ptz>,
) -> ApiResult<Ptz> {
    let codecs = module::<CodecModule>(&state, KIND)?;
    codecs.set_ptz(&id, body.pan, body.tilt, body.zoom).await?;
    ok(body)
}

async fn auto_framing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AutoFraming> {
    let codecs = module::<CodecModule>(&state, KIND)?;
    let enabled = codecs.auto_framing(&id).await?;
    ok(AutoFraming {
        enabled: Some(enabled),
    })
}

async fn set_auto_framing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SetAutoFraming>,
) -> ApiResult<AutoFraming> {
    let codecs = module::<CodecModule>(&state, KIND)?;
    codecs.set_auto_framing(&id, body.enabled).await?;
    ok(AutoFraming {
        enabled: Some(body.enabled),
    })
}

async fn reboot(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Reboot> {
    let codecs = module::<CodecModule>(&state, KIND)?;
    codecs.reboot(&id).await?;
    ok(Reboot { rebooting: true })
}
