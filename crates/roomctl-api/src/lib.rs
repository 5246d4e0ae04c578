//! REST control plane for the meeting-room controller.
//!
//! Exposes every device module of a [`ModuleManager`] under `/api/v1` with a
//! uniform `{success, data}` envelope, plus a short history of health
//! changes for the diagnostics panel.
//!
//! [`ModuleManager`]: roomctl_hardware::ModuleManager

pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ServerSettings, load_config};
pub use error::{ApiError, ApiResult};
pub use feed::HealthFeed;
pub use logging::setup_logging;
pub use routes::build_router;
pub use state::AppState;
