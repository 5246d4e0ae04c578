//! Device module and transport trait definitions.
//!
//! Three layers of contract live here:
//!
//! - [`DeviceModule`]: what the manager and the control plane see of a
//!   module (lifecycle, enumeration, status, health subscription).
//! - [`DeviceSession`]: the per-device state a [`ModuleBase`] guards with the
//!   device mutex and probes from the monitoring loop.
//! - One transport trait per device class (`DisplayTransport`,
//!   `CameraTransport`, ...): the wire-level operations of that class,
//!   implemented by a real adapter and by an in-memory mock.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro. They are dispatched
//! through enums (see [`crate::devices`] and [`crate::manager::AnyModule`]),
//! never as trait objects. [`DeviceSession`] spells out its futures as
//! `impl Future + Send` because the monitoring loop runs it on a spawned
//! task from generic code.
//!
//! [`ModuleBase`]: crate::base::ModuleBase

#![allow(async_fn_in_trait)]

use std::future::Future;

use roomctl_core::{DeviceInfo, HealthChangeEvent, LifecycleState, ModuleKind};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::health::ProbeOutcome;
use crate::types::DeviceStatus;

/// Driver for one device class.
///
/// # Lifecycle
///
/// ```text
/// Uninitialized ─initialize()─► Initialized ─start_monitoring()─► Monitoring
///                                     ▲                               │
///                                     └──────stop_monitoring()────────┘
/// any state ─shutdown()─► ShutDown
/// ```
///
/// Lifecycle calls are made by the manager only. `initialize` reports
/// failure as `false` instead of an error so that one broken device class
/// cannot stop the others from starting.
pub trait DeviceModule: Send + Sync {
    fn kind(&self) -> ModuleKind;

    fn is_enabled(&self) -> bool;

    fn lifecycle(&self) -> LifecycleState;

    fn is_initialized(&self) -> bool {
        self.lifecycle().is_initialized()
    }

    /// Validate configuration, open transport sessions and populate the
    /// device set. Returns `false` on failure or if already initialized.
    async fn initialize(&self) -> bool;

    /// Cached snapshot of every device, without I/O.
    fn devices(&self) -> Vec<DeviceInfo>;

    /// Identity, health and class-specific state of one device.
    async fn device_status(&self, id: &str) -> roomctl_core::Result<DeviceStatus>;

    /// Spawn the monitoring loop. No-op unless `Initialized`.
    fn start_monitoring(&self);

    /// Cancel the monitoring loop and wait for it to finish.
    async fn stop_monitoring(&self);

    /// Stop monitoring, close every session and enter `ShutDown`.
    async fn shutdown(&self);

    fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent>;
}

/// Per-device transport state guarded by the device mutex.
pub trait DeviceSession: Send + 'static {
    /// One lightweight liveness check.
    fn probe(&mut self) -> impl Future<Output = ProbeOutcome> + Send;

    /// Release the transport. Called once, at shutdown.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// LED display controller.
pub trait DisplayTransport: Send + Sync {
    async fn probe(&mut self) -> ProbeOutcome;

    /// Current brightness in percent.
    async fn brightness(&mut self) -> Result<u8>;

    async fn set_brightness(&mut self, level: u8) -> Result<()>;

    async fn set_power(&mut self, on: bool) -> Result<()>;

    /// Address of the controller currently in use.
    fn active_address(&self) -> Option<String>;

    async fn close(&mut self);
}

/// Raw PTZ position in device units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NativePtz {
    pub pan: f64,
    pub tilt: f64,
    pub zoom: f64,
}

/// PTZ camera reached through its vendor SDK session.
pub trait CameraTransport: Send + Sync {
    async fn probe(&mut self) -> ProbeOutcome;

    async fn ptz(&mut self) -> Result<NativePtz>;

    async fn set_ptz(&mut self, position: NativePtz) -> Result<()>;

    async fn set_auto_framing(&mut self, enabled: bool) -> Result<()>;

    async fn close(&mut self);
}

/// Conferencing codec driven through attribute get/set commands.
pub trait CodecTransport: Send + Sync {
    async fn probe(&mut self) -> ProbeOutcome;

    /// Value of `attribute` as the device prints it.
    async fn get(&mut self, attribute: &str) -> Result<String>;

    async fn set(&mut self, attribute: &str, value: &str) -> Result<()>;

    /// Request a restart. Returns once the request is sent; the device drops
    /// off the network shortly after.
    async fn reboot(&mut self) -> Result<()>;

    async fn close(&mut self);
}

/// Audio endpoint with a volume level and a mute switch.
pub trait AudioTransport: Send + Sync {
    async fn probe(&mut self) -> ProbeOutcome;

    /// Current volume in percent.
    async fn volume(&mut self) -> Result<u8>;

    async fn set_volume(&mut self, level: u8) -> Result<()>;

    async fn muted(&mut self) -> Result<bool>;

    async fn set_mute(&mut self, muted: bool) -> Result<()>;

    async fn close(&mut self);
}

/// DMX512 output adapter.
pub trait DmxOutput: Send {
    async fn write_frame(&mut self, frame: &roomctl_network::DmxFrame) -> Result<()>;

    fn close(&mut self);
}

