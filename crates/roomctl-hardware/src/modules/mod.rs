//! Concrete device modules, one per device class.
//!
//! Every command follows the same sequence: resolve the device (unknown id
//! is `DeviceNotFound`), validate parameters before any I/O, lock the device
//! session, talk to the transport, then update the cached detail and
//! `lastSeen`. Transport failures are logged here and surface to the caller
//! as domain errors; health is left to the monitoring loop.

mod audio;
mod camera;
mod codec;
mod display;
mod lighting;

pub use audio::{AudioModule, AudioSession};
pub use camera::{CameraModule, CameraSession, PtzMapping};
pub use codec::{CodecModule, CodecSession};
pub use display::{DisplayModule, DisplaySession};
pub use lighting::{FixtureSession, LightingModule};

use roomctl_core::{DeviceId, ModuleKind};
use tracing::warn;

use crate::HardwareError;

/// Log a failed command and convert it for the caller.
pub(crate) fn command_failed(
    kind: ModuleKind,
    device: &DeviceId,
    operation: &'static str,
    error: HardwareError,
) -> roomctl_core::Error {
    warn!(module = %kind, device = %device, operation, error = %error, "Device command failed");
    error.into()
}
