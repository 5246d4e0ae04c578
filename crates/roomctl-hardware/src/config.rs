//! Room configuration: which modules run and which devices they drive.
//!
//! Every section defaults to disabled, so an empty document yields a
//! manager with no modules. Device entries are checked one by one when the
//! module initializes (see [`admit`]); a bad entry is logged and skipped
//! without failing its module.
//!
//! ```
//! use roomctl_hardware::config::RoomConfig;
//!
//! let config: RoomConfig = toml::from_str(r#"
//!     [display]
//!     enabled = true
//!
//!     [[display.devices]]
//!     id = "wall"
//!     addresses = ["10.0.0.20", "10.0.0.21"]
//! "#).unwrap();
//!
//! assert!(config.display.enabled);
//! assert_eq!(config.display.devices[0].port, 80);
//! assert!(!config.lighting.enabled);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use roomctl_core::constants::{
    DEFAULT_DISPLAY_PORT, DEFAULT_DMX_BAUD_RATE, DEFAULT_DMX_FRAME_RATE_HZ, DEFAULT_OFFLINE_AFTER,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_REBOOT_GRACE_SECS,
    DEFAULT_TTP_PORT, DEFAULT_UNHEALTHY_AFTER, DMX_CHANNELS_PER_FIXTURE, DMX_UNIVERSE_SIZE,
    MAX_DMX_FRAME_RATE_HZ, MAX_VOLUME,
};
use roomctl_core::{DeviceId, DeviceInfo, ModuleKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::health::HealthPolicy;

const DEFAULT_TIMEOUT_MS: u64 = 3_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_display_port() -> u16 {
    DEFAULT_DISPLAY_PORT
}

fn default_ttp_port() -> u16 {
    DEFAULT_TTP_PORT
}

fn default_reboot_grace_secs() -> u64 {
    DEFAULT_REBOOT_GRACE_SECS
}

fn default_instance() -> String {
    "VideoCamera1".to_string()
}

fn default_pan_range() -> [f64; 2] {
    [-170.0, 170.0]
}

fn default_tilt_range() -> [f64; 2] {
    [-30.0, 90.0]
}

fn default_zoom_range() -> [f64; 2] {
    [0.0, 16384.0]
}

/// Devices of every class in the room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub monitoring: MonitoringConfig,
    pub display: DisplaySection,
    pub lighting: LightingSection,
    pub camera: CameraSection,
    pub biamp: CodecSection,
    pub system_audio: AudioSection,
    pub microphones: AudioSection,
    pub speakers: AudioSection,
}

impl RoomConfig {
    pub fn audio(&self, kind: ModuleKind) -> Option<&AudioSection> {
        match kind {
            ModuleKind::SystemAudio => Some(&self.system_audio),
            ModuleKind::Microphone => Some(&self.microphones),
            ModuleKind::Speaker => Some(&self.speakers),
            _ => None,
        }
    }
}

/// Global monitoring defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub unhealthy_after: u32,
    pub offline_after: u32,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            unhealthy_after: DEFAULT_UNHEALTHY_AFTER,
            offline_after: DEFAULT_OFFLINE_AFTER,
        }
    }
}

impl MonitoringConfig {
    pub fn policy(&self) -> HealthPolicy {
        MonitoringOverride::default().resolve(self)
    }
}

/// Per-module monitoring settings; unset fields fall back to the global ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringOverride {
    pub poll_interval_ms: Option<u64>,
    pub probe_timeout_ms: Option<u64>,
    pub unhealthy_after: Option<u32>,
    pub offline_after: Option<u32>,
}

impl MonitoringOverride {
    /// Merge with `global` into the policy a module runs with.
    ///
    /// Thresholds are clamped to at least one failure, and `offline_after`
    /// never undercuts `unhealthy_after`.
    pub fn resolve(&self, global: &MonitoringConfig) -> HealthPolicy {
        let unhealthy_after = self
            .unhealthy_after
            .unwrap_or(global.unhealthy_after)
            .max(1);
        let offline_after = self
            .offline_after
            .unwrap_or(global.offline_after)
            .max(unhealthy_after);

        HealthPolicy {
            poll_interval: Duration::from_millis(
                self.poll_interval_ms.unwrap_or(global.poll_interval_ms).max(1),
            ),
            probe_timeout: Duration::from_millis(
                self.probe_timeout_ms.unwrap_or(global.probe_timeout_ms).max(1),
            ),
            unhealthy_after,
            offline_after,
        }
    }
}

/// Identity and per-entry checks of one configured device.
pub trait DeviceEntry {
    fn id(&self) -> &str;

    fn name(&self) -> Option<&str>;

    fn model(&self) -> Option<&str>;

    /// Class-specific problems with this entry.
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Entries of `kind` that may be driven, with their device records.
///
/// Entries with an invalid or duplicate id, or that fail their own check,
/// are logged and left out. Order follows the configuration.
pub fn admit<T: DeviceEntry>(kind: ModuleKind, entries: &[T]) -> Vec<(DeviceInfo, &T)> {
    let mut seen = HashSet::new();
    let mut admitted = Vec::with_capacity(entries.len());

    for entry in entries {
        let id = match DeviceId::new(entry.id()) {
            Ok(id) => id,
            Err(e) => {
                warn!(module = %kind, id = entry.id(), error = %e, "Skipping device entry");
                continue;
            }
        };
        if !seen.insert(id.clone()) {
            warn!(module = %kind, device = %id, "Skipping duplicate device id");
            continue;
        }
        if let Err(reason) = entry.check() {
            warn!(module = %kind, device = %id, reason = %reason, "Skipping device entry");
            continue;
        }

        let mut info = DeviceInfo::new(id.clone(), entry.name().unwrap_or(id.as_str()));
        if let Some(model) = entry.model() {
            info = info.with_model(model);
        }
        admitted.push((info, entry));
    }
    admitted
}

// ============================================================================
// Display
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub enabled: bool,
    pub simulated: bool,
    pub monitoring: MonitoringOverride,
    pub devices: Vec<DisplayDeviceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayDeviceConfig {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    /// Controller addresses, tried in order.
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default = "default_display_port")]
    pub port: u16,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl DeviceEntry for DisplayDeviceConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn check(&self) -> Result<(), String> {
        if self.addresses.is_empty() {
            return Err("no controller addresses".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Lighting
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingSection {
    pub enabled: bool,
    pub simulated: bool,
    pub monitoring: MonitoringOverride,
    /// Serial device of the USB-DMX adapter.
    pub serial_port: String,
    pub baud_rate: u32,
    pub frame_rate_hz: u32,
    pub fixtures: Vec<FixtureConfig>,
}

impl Default for LightingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            simulated: false,
            monitoring: MonitoringOverride::default(),
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_DMX_BAUD_RATE,
            frame_rate_hz: DEFAULT_DMX_FRAME_RATE_HZ,
            fixtures: Vec::new(),
        }
    }
}

impl LightingSection {
    /// Configured frame rate, clamped to what DMX512 can carry.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate_hz.clamp(1, MAX_DMX_FRAME_RATE_HZ)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    /// First of the fixture's four channels (red, green, blue, white).
    pub start_channel: u16,
}

impl DeviceEntry for FixtureConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn check(&self) -> Result<(), String> {
        let last = DMX_UNIVERSE_SIZE as u16 - DMX_CHANNELS_PER_FIXTURE + 1;
        if !(1..=last).contains(&self.start_channel) {
            return Err(format!(
                "start_channel must be 1-{last}, got {}",
                self.start_channel
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSection {
    pub enabled: bool,
    pub simulated: bool,
    pub monitoring: MonitoringOverride,
    pub devices: Vec<CameraDeviceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDeviceConfig {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    /// Serial number the vendor SDK opens sessions with.
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Native pan units at normalised -100 and 100.
    #[serde(default = "default_pan_range")]
    pub pan_range: [f64; 2],
    #[serde(default = "default_tilt_range")]
    pub tilt_range: [f64; 2],
    /// Native zoom units at zoom factor 1.0 and 10.0.
    #[serde(default = "default_zoom_range")]
    pub zoom_range: [f64; 2],
}

impl DeviceEntry for CameraDeviceConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn check(&self) -> Result<(), String> {
        for (axis, [lo, hi]) in [
            ("pan_range", self.pan_range),
            ("tilt_range", self.tilt_range),
            ("zoom_range", self.zoom_range),
        ] {
            if !lo.is_finite() || !hi.is_finite() || lo == hi {
                return Err(format!("{axis} must be two distinct finite numbers"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Conferencing codec
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecSection {
    pub enabled: bool,
    pub simulated: bool,
    pub monitoring: MonitoringOverride,
    pub devices: Vec<CodecDeviceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecDeviceConfig {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_ttp_port")]
    pub port: u16,
    /// Instance tag of the camera control block.
    #[serde(default = "default_instance")]
    pub instance: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_reboot_grace_secs")]
    pub reboot_grace_secs: u64,
}

impl DeviceEntry for CodecDeviceConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn check(&self) -> Result<(), String> {
        if self.instance.is_empty() || self.instance.chars().any(char::is_whitespace) {
            return Err(format!("invalid instance tag '{}'", self.instance));
        }
        Ok(())
    }
}

// ============================================================================
// Audio
// ============================================================================

/// Which side of the OS mixer a system audio endpoint controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTarget {
    /// Default output device.
    #[default]
    Sink,
    /// Default input device.
    Source,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    pub enabled: bool,
    pub simulated: bool,
    pub monitoring: MonitoringOverride,
    /// Mixer CLI used by system audio endpoints.
    pub mixer_program: String,
    pub devices: Vec<AudioDeviceConfig>,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            enabled: false,
            simulated: false,
            monitoring: MonitoringOverride::default(),
            mixer_program: "pactl".to_string(),
            devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDeviceConfig {
    pub id: String,
    pub name: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub target: AudioTarget,
    /// Control surface of a networked endpoint; unset for system audio.
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Named volume levels.
    #[serde(default)]
    pub presets: BTreeMap<String, u8>,
}

impl DeviceEntry for AudioDeviceConfig {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn check(&self) -> Result<(), String> {
        match self
            .presets
            .iter()
            .find(|(_, level)| i32::from(**level) > MAX_VOLUME)
        {
            Some((name, level)) => Err(format!("preset '{name}' level {level} exceeds 100")),
            None => Ok(()),
        }
    }
}
