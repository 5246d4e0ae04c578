//! Device orchestration for the meeting-room controller.
//!
//! This crate keeps a heterogeneous set of AV devices (LED display
//! controllers, DMX lighting fixtures, PTZ cameras, audio endpoints and a
//! conferencing codec) in a known, continuously monitored state behind one
//! module contract.
//!
//! # Design Philosophy
//!
//! - **One contract**: every device class is a [`DeviceModule`] with the same
//!   lifecycle, enumeration, status and health subscription. Class-specific
//!   commands live on the concrete module types.
//! - **Async-first**: all I/O goes through native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT), dispatched through enums rather than
//!   trait objects.
//! - **Serialised devices**: each device has its own FIFO async mutex. Health
//!   probes and commands on the same device never overlap; different devices
//!   never wait for each other.
//! - **Contained failures**: a device that goes away becomes `Unhealthy`, then
//!   `Offline`, and the rest of the room keeps working.
//!
//! # Layers
//!
//! ```text
//!  ModuleManager ─► AnyModule ─► DisplayModule / LightingModule / ...
//!                                      │
//!                                 ModuleBase<S>   (lifecycle, monitor loop)
//!                                      │
//!                               DeviceSlot<S>     (mutex + cached DeviceInfo)
//!                                      │
//!                           Any*Transport enum ─► HTTP / serial / TTP / pactl
//!                                             └─► in-memory mock
//! ```
//!
//! # Example
//!
//! ```no_run
//! use roomctl_hardware::config::RoomConfig;
//! use roomctl_hardware::manager::ModuleManager;
//! use roomctl_hardware::modules::DisplayModule;
//!
//! # async fn example(config: RoomConfig) -> roomctl_core::Result<()> {
//! let manager = ModuleManager::build_from_config(&config);
//! manager.initialize_all().await;
//! manager.start_monitoring_all();
//!
//! if let Some(display) = manager.get::<DisplayModule>() {
//!     display.set_brightness("front-wall", 70).await?;
//! }
//!
//! manager.shutdown_all().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! Every transport has an in-memory mock in [`mock`] that returns a
//! device/handle pair: the device goes into a module, the handle stays with
//! the test to inspect what reached the device and to inject faults.

pub mod base;
pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod health;
pub mod manager;
pub mod mock;
pub mod modules;
pub mod traits;
pub mod transport;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use events::{EventBus, ModuleContext};
pub use health::{HealthPolicy, ProbeOutcome};
pub use traits::{DeviceModule, DeviceSession};
pub use types::{DeviceStatus, Ptz, Rgbw, StatusDetail};

// Re-export manager types
pub use manager::{AnyModule, FromAnyModule, InitReport, ModuleManager, ModuleSummary};
