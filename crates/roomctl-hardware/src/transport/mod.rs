//! Real device adapters built on `roomctl-network`.
//!
//! Each adapter implements one class transport trait and owns the
//! classification of its own probe: whether a failure means the device
//! answered badly ([`ProbeOutcome::Degraded`]) or did not answer at all
//! ([`ProbeOutcome::Unreachable`]).
//!
//! [`ProbeOutcome::Degraded`]: crate::health::ProbeOutcome::Degraded
//! [`ProbeOutcome::Unreachable`]: crate::health::ProbeOutcome::Unreachable

mod audio;
mod camera;
mod display;
mod dmx;
mod ttp;

pub use audio::{HttpAudioEndpoint, PactlEndpoint, parse_mute, parse_volume};
pub use camera::CameraSdk;
pub use display::HttpDisplay;
pub use ttp::{TtpReply, TtpSession, parse_reply};

use crate::HardwareError;
use crate::health::ProbeOutcome;

/// Classify a failed probe exchange.
pub(crate) fn failed_probe(error: &HardwareError) -> ProbeOutcome {
    if error.is_device_reply() {
        ProbeOutcome::Degraded(error.to_string())
    } else {
        ProbeOutcome::Unreachable(error.to_string())
    }
}
