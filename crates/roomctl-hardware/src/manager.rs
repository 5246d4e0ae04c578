//! Module registry and fleet-wide lifecycle.
//!
//! The [`ModuleManager`] owns every device module in startup order and the
//! [`EventBus`] they all publish into. It drives the lifecycle of the whole
//! fleet while keeping failures contained: a module that fails to
//! initialize is reported and skipped, and one that panics during shutdown
//! does not stop the others from closing their devices.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!  control plane ─►│ModuleManager │── by_kind / get::<T> ──► AnyModule
//!                  └──────┬───────┘
//!                         │ one ModuleContext each
//!     ┌─────────┬─────────┼─────────┬──────────┐
//!  Display  Lighting   Camera    Audio ×3    Codec
//!     └─────────┴─────────┴────┬────┴──────────┘
//!                              ▼
//!                          EventBus ──► subscribe()
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use roomctl_hardware::config::RoomConfig;
//! use roomctl_hardware::manager::ModuleManager;
//!
//! # async fn example(config: RoomConfig) {
//! let manager = ModuleManager::build_from_config(&config);
//! let report = manager.initialize_all().await;
//! println!("{} modules up", report.initialized.len());
//!
//! manager.start_monitoring_all();
//! // ... serve requests ...
//! manager.shutdown_all().await;
//! # }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use roomctl_core::{DeviceHealth, DeviceInfo, HealthChangeEvent, LifecycleState, ModuleKind};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::RoomConfig;
use crate::events::{EventBus, ModuleContext};
use crate::modules::{AudioModule, CameraModule, CodecModule, DisplayModule, LightingModule};
use crate::traits::DeviceModule;
use crate::types::DeviceStatus;

/// Any concrete device module, shared.
///
/// Cloning is cheap; every clone refers to the same module.
#[derive(Clone)]
pub enum AnyModule {
    Display(Arc<DisplayModule>),
    Lighting(Arc<LightingModule>),
    Camera(Arc<CameraModule>),
    /// System audio, microphones or speakers.
    Audio(Arc<AudioModule>),
    Codec(Arc<CodecModule>),
}

macro_rules! dispatch {
    ($self:ident, $module:ident => $body:expr) => {
        match $self {
            AnyModule::Display($module) => $body,
            AnyModule::Lighting($module) => $body,
            AnyModule::Camera($module) => $body,
            AnyModule::Audio($module) => $body,
            AnyModule::Codec($module) => $body,
        }
    };
}

impl DeviceModule for AnyModule {
    fn kind(&self) -> ModuleKind {
        dispatch!(self, m => m.kind())
    }

    fn is_enabled(&self) -> bool {
        dispatch!(self, m => m.is_enabled())
    }

    fn lifecycle(&self) -> LifecycleState {
        dispatch!(self, m => m.lifecycle())
    }

    async fn initialize(&self) -> bool {
        dispatch!(self, m => m.initialize().await)
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        dispatch!(self, m => m.devices())
    }

    async fn device_status(&self, id: &str) -> roomctl_core::Result<DeviceStatus> {
        dispatch!(self, m => m.device_status(id).await)
    }

    fn start_monitoring(&self) {
        dispatch!(self, m => m.start_monitoring())
    }

    async fn stop_monitoring(&self) {
        dispatch!(self, m => m.stop_monitoring().await)
    }

    async fn shutdown(&self) {
        dispatch!(self, m => m.shutdown().await)
    }

    fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent> {
        dispatch!(self, m => m.subscribe())
    }
}

/// Typed view into an [`AnyModule`].
pub trait FromAnyModule: Sized {
    fn from_any(module: &AnyModule) -> Option<Arc<Self>>;
}

macro_rules! module_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl FromAnyModule for $ty {
                fn from_any(module: &AnyModule) -> Option<Arc<Self>> {
                    match module {
                        AnyModule::$variant(m) => Some(Arc::clone(m)),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for AnyModule {
                fn from(module: $ty) -> Self {
                    AnyModule::$variant(Arc::new(module))
                }
            }

            impl From<Arc<$ty>> for AnyModule {
                fn from(module: Arc<$ty>) -> Self {
                    AnyModule::$variant(module)
                }
            }
        )*
    };
}

module_conversions! {
    Display => DisplayModule,
    Lighting => LightingModule,
    Camera => CameraModule,
    Audio => AudioModule,
    Codec => CodecModule,
}

/// Outcome of [`ModuleManager::initialize_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub initialized: Vec<ModuleKind>,
    pub failed: Vec<ModuleKind>,
    /// Disabled in configuration; never initialized.
    pub disabled: Vec<ModuleKind>,
}

impl InitReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Lifecycle and device health of one module, for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub kind: ModuleKind,
    pub enabled: bool,
    pub lifecycle: LifecycleState,
    pub devices: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub offline: usize,
}

impl ModuleSummary {
    fn of(module: &AnyModule) -> Self {
        let devices = module.devices();
        let count = |health: DeviceHealth| devices.iter().filter(|d| d.health == health).count();
        Self {
            kind: module.kind(),
            enabled: module.is_enabled(),
            lifecycle: module.lifecycle(),
            devices: devices.len(),
            healthy: count(DeviceHealth::Healthy),
            unhealthy: count(DeviceHealth::Unhealthy),
            offline: count(DeviceHealth::Offline),
        }
    }
}

/// Owns every device module.
///
/// # Lifecycle
///
/// 1. Construct with [`ModuleManager::build_from_config`], or by hand with
///    [`ModuleManager::register`] and the manager's [`ModuleManager::context`]
/// 2. [`initialize_all`](ModuleManager::initialize_all)
/// 3. [`start_monitoring_all`](ModuleManager::start_monitoring_all)
/// 4. Serve commands through [`get`](ModuleManager::get) and
///    [`by_kind`](ModuleManager::by_kind)
/// 5. [`shutdown_all`](ModuleManager::shutdown_all)
pub struct ModuleManager {
    modules: Vec<AnyModule>,
    events: EventBus,
}

impl ModuleManager {
    pub fn new(events: EventBus) -> Self {
        Self {
            modules: Vec::new(),
            events,
        }
    }

    /// Build every module described by `config`, disabled ones included, in
    /// startup order.
    pub fn build_from_config(config: &RoomConfig) -> Self {
        let mut manager = Self::new(EventBus::new());
        let global = &config.monitoring;

        manager.register(DisplayModule::new(
            config.display.clone(),
            config.display.monitoring.resolve(global),
            manager.context(ModuleKind::Display),
        ));
        manager.register(LightingModule::new(
            config.lighting.clone(),
            config.lighting.monitoring.resolve(global),
            manager.context(ModuleKind::Lighting),
        ));
        manager.register(CameraModule::new(
            config.camera.clone(),
            config.camera.monitoring.resolve(global),
            manager.context(ModuleKind::Camera),
        ));
        for kind in [
            ModuleKind::SystemAudio,
            ModuleKind::Microphone,
            ModuleKind::Speaker,
        ] {
            if let Some(section) = config.audio(kind) {
                manager.register(AudioModule::new(
                    kind,
                    section.clone(),
                    section.monitoring.resolve(global),
                    manager.context(kind),
                ));
            }
        }
        manager.register(CodecModule::new(
            config.biamp.clone(),
            config.biamp.monitoring.resolve(global),
            manager.context(ModuleKind::Codec),
        ));

        manager
    }

    /// Collaborators for a module that will be registered with this manager.
    pub fn context(&self, kind: ModuleKind) -> ModuleContext {
        ModuleContext::new(kind, self.events.clone())
    }

    /// Append a module; startup follows registration order.
    pub fn register(&mut self, module: impl Into<AnyModule>) {
        let module = module.into();
        if self.by_kind(module.kind()).is_some() {
            warn!(module = %module.kind(), "Module kind registered twice");
        }
        self.modules.push(module);
    }

    /// Initialize every enabled module in order, continuing past failures.
    pub async fn initialize_all(&self) -> InitReport {
        let mut report = InitReport::default();
        for module in &self.modules {
            let kind = module.kind();
            if !module.is_enabled() {
                report.disabled.push(kind);
                continue;
            }
            if module.initialize().await {
                report.initialized.push(kind);
            } else {
                error!(module = %kind, "Module failed to initialize");
                report.failed.push(kind);
            }
        }
        info!(
            initialized = report.initialized.len(),
            failed = report.failed.len(),
            disabled = report.disabled.len(),
            "Modules initialized"
        );
        report
    }

    /// Start monitoring every initialized module.
    pub fn start_monitoring_all(&self) {
        for module in &self.modules {
            if module.lifecycle() == LifecycleState::Initialized {
                module.start_monitoring();
            }
        }
    }

    pub async fn stop_monitoring_all(&self) {
        for module in &self.modules {
            module.stop_monitoring().await;
        }
    }

    /// Shut every module down in reverse registration order.
    ///
    /// Best effort: a panic inside one module's shutdown is logged and the
    /// remaining modules are still shut down.
    pub async fn shutdown_all(&self) {
        for module in self.modules.iter().rev() {
            let kind = module.kind();
            if AssertUnwindSafe(module.shutdown())
                .catch_unwind()
                .await
                .is_err()
            {
                error!(module = %kind, "Module panicked during shutdown");
            }
        }
        info!("All modules shut down");
    }

    /// First registered module of type `T`.
    pub fn get<T: FromAnyModule>(&self) -> Option<Arc<T>> {
        self.modules.iter().find_map(T::from_any)
    }

    pub fn audio(&self, kind: ModuleKind) -> Option<Arc<AudioModule>> {
        match self.by_kind(kind)? {
            AnyModule::Audio(module) => Some(module),
            _ => None,
        }
    }

    pub fn by_kind(&self, kind: ModuleKind) -> Option<AnyModule> {
        self.modules.iter().find(|m| m.kind() == kind).cloned()
    }

    pub fn modules(&self) -> &[AnyModule] {
        &self.modules
    }

    pub fn summaries(&self) -> Vec<ModuleSummary> {
        self.modules.iter().map(ModuleSummary::of).collect()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Health changes of every module.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AudioSection, DisplayDeviceConfig, DisplaySection};

    fn display_section(enabled: bool) -> DisplaySection {
        DisplaySection {
            enabled,
            simulated: true,
            devices: vec![DisplayDeviceConfig {
                id: "wall".to_string(),
                name: Some("Front Wall".to_string()),
                model: None,
                addresses: vec!["10.0.0.20".to_string()],
                port: 80,
                timeout_ms: 100,
            }],
            ..Default::default()
        }
    }

    fn room() -> RoomConfig {
        RoomConfig {
            display: display_section(true),
            speakers: AudioSection {
                enabled: true,
                simulated: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_build_registers_every_kind_in_order() {
        let manager = ModuleManager::build_from_config(&room());
        let kinds: Vec<_> = manager.modules().iter().map(|m| m.kind()).collect();
        assert_eq!(kinds, ModuleKind::ALL.to_vec());
    }

    #[test]
    fn test_typed_lookup() {
        let manager = ModuleManager::build_from_config(&room());

        assert!(manager.get::<DisplayModule>().is_some());
        assert!(manager.get::<CodecModule>().is_some());
        assert_eq!(
            manager.audio(ModuleKind::Speaker).map(|m| m.kind()),
            Some(ModuleKind::Speaker)
        );
        assert!(manager.audio(ModuleKind::Display).is_none());
    }

    #[tokio::test]
    async fn test_initialize_all_reports_disabled() {
        let manager = ModuleManager::build_from_config(&room());
        let report = manager.initialize_all().await;

        assert_eq!(report.initialized, vec![ModuleKind::Display, ModuleKind::Speaker]);
        assert!(report.failed.is_empty());
        assert_eq!(report.disabled.len(), 5);
        assert!(report.all_ok());
    }

    #[tokio::test]
    async fn test_lifecycle_of_whole_fleet() {
        let manager = ModuleManager::build_from_config(&room());
        manager.initialize_all().await;

        manager.start_monitoring_all();
        let display = manager.by_kind(ModuleKind::Display).unwrap();
        assert_eq!(display.lifecycle(), LifecycleState::Monitoring);
        let camera = manager.by_kind(ModuleKind::Camera).unwrap();
        assert_eq!(camera.lifecycle(), LifecycleState::Uninitialized);

        manager.stop_monitoring_all().await;
        assert_eq!(display.lifecycle(), LifecycleState::Initialized);

        manager.shutdown_all().await;
        assert!(
            manager
                .modules()
                .iter()
                .all(|m| m.lifecycle() == LifecycleState::ShutDown)
        );
    }

    #[tokio::test]
    async fn test_summaries() {
        let manager = ModuleManager::build_from_config(&room());
        manager.initialize_all().await;

        let summary = &manager.summaries()[0];
        assert_eq!(summary.kind, ModuleKind::Display);
        assert!(summary.enabled);
        assert_eq!(summary.devices, 1);
        assert_eq!(summary.offline, 1);
    }
}
