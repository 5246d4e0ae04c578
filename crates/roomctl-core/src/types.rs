use crate::{Result, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device class handled by one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Display,
    Lighting,
    Camera,
    SystemAudio,
    Microphone,
    Speaker,
    Codec,
}

impl ModuleKind {
    /// All module kinds in default startup order.
    pub const ALL: [ModuleKind; 7] = [
        ModuleKind::Display,
        ModuleKind::Lighting,
        ModuleKind::Camera,
        ModuleKind::SystemAudio,
        ModuleKind::Microphone,
        ModuleKind::Speaker,
        ModuleKind::Codec,
    ];

    /// Stable lowercase name used in logs and configuration.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Lighting => "lighting",
            Self::Camera => "camera",
            Self::SystemAudio => "system_audio",
            Self::Microphone => "microphone",
            Self::Speaker => "speaker",
            Self::Codec => "biamp",
        }
    }

    /// Error code reported by the control plane for an unknown device.
    #[must_use]
    pub fn not_found_code(&self) -> &'static str {
        match self {
            Self::Display => "DISPLAY_NOT_FOUND",
            Self::Lighting => "LIGHTING_NOT_FOUND",
            Self::Camera => "CAMERA_NOT_FOUND",
            Self::SystemAudio => "AUDIO_NOT_FOUND",
            Self::Microphone => "MICROPHONE_NOT_FOUND",
            Self::Speaker => "SPEAKER_NOT_FOUND",
            Self::Codec => "BIAMP_NOT_FOUND",
        }
    }

    /// Audio kinds share one driver implementation.
    #[must_use]
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::SystemAudio | Self::Microphone | Self::Speaker)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display => write!(f, "Display"),
            Self::Lighting => write!(f, "Lighting"),
            Self::Camera => write!(f, "Camera"),
            Self::SystemAudio => write!(f, "SystemAudio"),
            Self::Microphone => write!(f, "Microphone"),
            Self::Speaker => write!(f, "Speaker"),
            Self::Codec => write!(f, "Biamp"),
        }
    }
}

/// Stable device identifier assigned by configuration.
///
/// Identifiers appear as a single path segment on the control plane, so
/// they may not be empty and may not contain `/` or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDeviceId` for an empty identifier or one that
    /// contains `/` or whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidDeviceId("identifier is empty".to_string()));
        }
        if id.contains('/') || id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidDeviceId(format!(
                "'{id}' contains '/' or whitespace"
            )));
        }
        Ok(DeviceId(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeviceId::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceId::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl PartialEq<str> for DeviceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Liveness classification of one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceHealth {
    /// Not reachable, or never seen since startup.
    #[default]
    Offline,
    /// Reachable but failing, or failing intermittently.
    Unhealthy,
    Healthy,
}

impl DeviceHealth {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl fmt::Display for DeviceHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "Offline"),
            Self::Unhealthy => write!(f, "Unhealthy"),
            Self::Healthy => write!(f, "Healthy"),
        }
    }
}

/// Identity and live status of one physical device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: DeviceId,

    /// Human-readable name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,

    pub health: DeviceHealth,

    /// Last successful transport round-trip.
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceInfo {
    /// Create a device record that has not been seen yet.
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            model: None,
            device_type: None,
            health: DeviceHealth::Offline,
            last_seen: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }
}

/// One observed health transition of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChangeEvent {
    pub module: ModuleKind,
    pub device_id: DeviceId,
    #[serde(rename = "previousHealth")]
    pub previous: DeviceHealth,
    #[serde(rename = "newHealth")]
    pub current: DeviceHealth,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Lifecycle of a module (not of its devices).
///
/// ```text
/// Uninitialized ─► Initialized ⇄ Monitoring
///        │              │            │
///        └──────────────┴────────────┴──► ShutDown
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
    Monitoring,
    ShutDown,
}

impl LifecycleState {
    /// `true` once `initialize` succeeded and until shutdown.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized | Self::Monitoring)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Initialized => write!(f, "Initialized"),
            Self::Monitoring => write!(f, "Monitoring"),
            Self::ShutDown => write!(f, "ShutDown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("wall-left", true)]
    #[case("cam_1", true)]
    #[case("", false)]
    #[case("a/b", false)]
    #[case("front wall", false)]
    fn test_device_id_validation(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(DeviceId::new(raw).is_ok(), valid);
    }

    #[test]
    fn test_device_id_serde_rejects_invalid() {
        let result: std::result::Result<DeviceId, _> = serde_json::from_str("\"a/b\"");
        assert!(result.is_err());

        let id: DeviceId = serde_json::from_str("\"cam-1\"").unwrap();
        assert_eq!(id.as_str(), "cam-1");
    }

    #[test]
    fn test_device_info_json_shape() {
        let info = DeviceInfo::new(DeviceId::new("wall").unwrap(), "Front Wall")
            .with_device_type("led-wall");
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["id"], "wall");
        assert_eq!(json["deviceType"], "led-wall");
        assert_eq!(json["health"], "Offline");
        assert!(json["lastSeen"].is_null());
        assert!(json.get("model").is_none());
    }

    #[test]
    fn test_health_event_json_shape() {
        let event = HealthChangeEvent {
            module: ModuleKind::Codec,
            device_id: DeviceId::new("tesira").unwrap(),
            previous: DeviceHealth::Healthy,
            current: DeviceHealth::Unhealthy,
            timestamp: Utc::now(),
            error: Some("timeout".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["module"], "codec");
        assert_eq!(json["deviceId"], "tesira");
        assert_eq!(json["previousHealth"], "Healthy");
        assert_eq!(json["newHealth"], "Unhealthy");
        assert_eq!(json["error"], "timeout");
    }

    #[rstest]
    #[case(ModuleKind::Display, "DISPLAY_NOT_FOUND")]
    #[case(ModuleKind::SystemAudio, "AUDIO_NOT_FOUND")]
    #[case(ModuleKind::Codec, "BIAMP_NOT_FOUND")]
    fn test_not_found_codes(#[case] kind: ModuleKind, #[case] code: &str) {
        assert_eq!(kind.not_found_code(), code);
    }

    #[test]
    fn test_lifecycle_is_initialized() {
        assert!(!LifecycleState::Uninitialized.is_initialized());
        assert!(LifecycleState::Initialized.is_initialized());
        assert!(LifecycleState::Monitoring.is_initialized());
        assert!(!LifecycleState::ShutDown.is_initialized());
    }

    #[test]
    fn test_default_health_is_offline() {
        assert_eq!(DeviceHealth::default(), DeviceHealth::Offline);
    }
}
