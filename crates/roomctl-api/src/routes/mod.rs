//! REST routes under `/api/v1`.
//!
//! Handlers resolve their module from the manager, call one module
//! operation and wrap the result in the response envelope. Validation and
//! device lookup happen inside the modules; handlers only parse bodies.

mod audio;
mod camera;
mod codec;
mod display;
mod lighting;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Router};
use roomctl_core::{DeviceInfo, Error, HealthChangeEvent, LifecycleState, ModuleKind};
use roomctl_hardware::DeviceModule;
use roomctl_hardware::manager::{FromAnyModule, ModuleSummary};
use serde::Serialize;

use crate::error::{ApiError, ApiResult, ok};
use crate::state::AppState;

/// Build the control-plane router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/health/events", get(health_events))
        .route("/modules", get(modules))
        .nest("/displays", display::routes())
        .nest("/lighting", lighting::routes())
        .nest("/cameras", camera::routes())
        .nest(
            "/audio",
            audio::routes().layer(Extension(ModuleKind::SystemAudio)),
        )
        .nest(
            "/microphones",
            audio::routes().layer(Extension(ModuleKind::Microphone)),
        )
        .nest(
            "/speakers",
            audio::routes().layer(Extension(ModuleKind::Speaker)),
        )
        .nest("/biamp", codec::routes());

    Router::new().nest("/api/v1", api).with_state(state)
}

/// Registered module of type `T`, or the class's not-found error.
fn module<T: FromAnyModule>(state: &AppState, kind: ModuleKind) -> Result<Arc<T>, ApiError> {
    state
        .manager
        .get::<T>()
        .ok_or_else(|| Error::ModuleUnavailable(kind).into())
}

/// Device list of a module that is up.
fn device_list<M: DeviceModule>(module: &M) -> ApiResult<Vec<DeviceInfo>> {
    if !module.is_initialized() {
        return Err(Error::ModuleUnavailable(module.kind()).into());
    }
    ok(module.devices())
}

async fn health(State(state): State<AppState>) -> ApiResult<Vec<ModuleSummary>> {
    ok(state.manager.summaries())
}

async fn health_events(State(state): State<AppState>) -> ApiResult<Vec<HealthChangeEvent>> {
    ok(state.feed.recent())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleView {
    kind: ModuleKind,
    enabled: bool,
    lifecycle: LifecycleState,
    initialized: bool,
}

async fn modules(State(state): State<AppState>) -> ApiResult<Vec<ModuleView>> {
    let views = state
        .manager
        .modules()
        .iter()
        .map(|m| ModuleView {
            kind: m.kind(),
            enabled: m.is_enabled(),
            lifecycle: m.lifecycle(),
            initialized: m.is_initialized(),
        })
        .collect();
    ok(views)
}
