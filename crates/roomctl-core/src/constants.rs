//! Shared constants for device orchestration.
//!
//! Ranges in this module are the normalised ranges exposed on the control
//! plane. Drivers convert them to native device units at the transport
//! boundary, so every module validates against the same numbers regardless of
//! the hardware behind it.
//!
//! # Usage
//!
//! ```
//! use roomctl_core::constants::*;
//!
//! assert!((MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&50));
//! assert_eq!(DMX_UNIVERSE_SIZE, 512);
//! ```

// ============================================================================
// Monitoring Defaults
// ============================================================================

/// Interval between two monitoring ticks of a module (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Upper bound for a single device probe (milliseconds).
///
/// A probe that does not complete in time is recorded as unreachable.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 3_000;

/// Consecutive failed probes before a healthy device is reported `Unhealthy`.
pub const DEFAULT_UNHEALTHY_AFTER: u32 = 1;

/// Consecutive failed probes before a device is reported `Offline`.
pub const DEFAULT_OFFLINE_AFTER: u32 = 3;

/// Capacity of the health-change broadcast channel.
///
/// Slow subscribers lose the oldest events once this many are queued.
pub const HEALTH_EVENT_CAPACITY: usize = 64;

// ============================================================================
// Display
// ============================================================================

/// Minimum display/fixture brightness (percent).
pub const MIN_BRIGHTNESS: i32 = 0;

/// Maximum display/fixture brightness (percent).
pub const MAX_BRIGHTNESS: i32 = 100;

/// Default HTTP port of an LED display controller.
pub const DEFAULT_DISPLAY_PORT: u16 = 80;

// ============================================================================
// Lighting (DMX512)
// ============================================================================

/// Number of slots in one DMX512 universe.
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// Channels used by one RGBW fixture (red, green, blue, white).
pub const DMX_CHANNELS_PER_FIXTURE: u16 = 4;

/// Maximum value of a single DMX channel.
pub const MAX_CHANNEL_VALUE: i32 = 255;

/// Default DMX refresh rate (frames per second).
pub const DEFAULT_DMX_FRAME_RATE_HZ: u32 = 40;

/// Highest refresh rate DMX512 can sustain with a full universe.
pub const MAX_DMX_FRAME_RATE_HZ: u32 = 44;

/// Default baud rate of the USB-serial DMX adapter.
pub const DEFAULT_DMX_BAUD_RATE: u32 = 57_600;

// ============================================================================
// Camera
// ============================================================================

/// Normalised pan range lower bound.
pub const MIN_PAN: f64 = -100.0;

/// Normalised pan range upper bound.
pub const MAX_PAN: f64 = 100.0;

/// Normalised tilt range lower bound.
pub const MIN_TILT: f64 = -100.0;

/// Normalised tilt range upper bound.
pub const MAX_TILT: f64 = 100.0;

/// Minimum zoom factor (no magnification).
pub const MIN_ZOOM: f64 = 1.0;

/// Maximum zoom factor.
pub const MAX_ZOOM: f64 = 10.0;

// ============================================================================
// Conferencing Codec
// ============================================================================

/// Default Tesira Text Protocol port (Telnet).
pub const DEFAULT_TTP_PORT: u16 = 23;

/// Time a codec stays unreachable after a reboot command (seconds).
pub const DEFAULT_REBOOT_GRACE_SECS: u64 = 30;

// ============================================================================
// Audio
// ============================================================================

/// Minimum volume (percent).
pub const MIN_VOLUME: i32 = 0;

/// Maximum volume (percent).
pub const MAX_VOLUME: i32 = 100;

/// Step used by relative volume changes when the caller gives none.
pub const DEFAULT_VOLUME_STEP: i32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_thresholds_are_ordered() {
        assert!(DEFAULT_UNHEALTHY_AFTER <= DEFAULT_OFFLINE_AFTER);
        assert!(DEFAULT_PROBE_TIMEOUT_MS < DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_dmx_frame_rate_bounds() {
        assert!(DEFAULT_DMX_FRAME_RATE_HZ <= MAX_DMX_FRAME_RATE_HZ);
        assert_eq!(DMX_UNIVERSE_SIZE % DMX_CHANNELS_PER_FIXTURE as usize, 0);
    }
}
