//! Class-specific device state reported alongside [`DeviceInfo`].

use roomctl_core::DeviceInfo;
use serde::{Deserialize, Serialize};

/// Base colour of an RGBW fixture, one byte per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgbw {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
}

impl Rgbw {
    pub const fn new(red: u8, green: u8, blue: u8, white: u8) -> Self {
        Self {
            red,
            green,
            blue,
            white,
        }
    }

    /// DMX output for this colour at `brightness` percent.
    ///
    /// Every channel is scaled by the same factor, so the hue stays put while
    /// the level changes.
    ///
    /// ```
    /// use roomctl_hardware::types::Rgbw;
    ///
    /// let warm = Rgbw::new(255, 128, 0, 40);
    /// assert_eq!(warm.scaled(50), [128, 64, 0, 20]);
    /// assert_eq!(warm.scaled(100), [255, 128, 0, 40]);
    /// assert_eq!(warm.scaled(0), [0, 0, 0, 0]);
    /// ```
    pub fn scaled(&self, brightness: u8) -> [u8; 4] {
        let brightness = u32::from(brightness.min(100));
        let scale = |c: u8| ((u32::from(c) * brightness + 50) / 100) as u8;
        [
            scale(self.red),
            scale(self.green),
            scale(self.blue),
            scale(self.white),
        ]
    }
}

/// Pan/tilt/zoom in the normalised control-plane ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ptz {
    pub pan: f64,
    pub tilt: f64,
    pub zoom: f64,
}

impl Ptz {
    /// Centred, no magnification.
    pub const HOME: Ptz = Ptz {
        pan: 0.0,
        tilt: 0.0,
        zoom: 1.0,
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub brightness: Option<u8>,
    pub power: Option<bool>,
    /// Controller address that answered last.
    pub active_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureState {
    pub start_channel: u16,
    pub color: Rgbw,
    pub brightness: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub ptz: Option<Ptz>,
    pub auto_framing: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecState {
    pub ptz: Option<Ptz>,
    pub auto_framing: Option<bool>,
    pub rebooting: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioState {
    pub volume: Option<u8>,
    pub muted: Option<bool>,
    /// Names of the configured volume presets.
    pub presets: Vec<String>,
}

/// Class-specific part of a device status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusDetail {
    Display(DisplayState),
    Fixture(FixtureState),
    Camera(CameraState),
    Codec(CodecState),
    Audio(AudioState),
}

/// Identity, health and class-specific state of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub detail: StatusDetail,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use roomctl_core::DeviceId;

    #[test]
    fn test_full_brightness_is_identity() {
        let color = Rgbw::new(1, 127, 128, 255);
        assert_eq!(color.scaled(100), [1, 127, 128, 255]);
    }

    #[test]
    fn test_status_flattens_info() {
        let status = DeviceStatus {
            info: DeviceInfo::new(DeviceId::new("wall").unwrap(), "Front Wall"),
            detail: StatusDetail::Display(DisplayState {
                brightness: Some(70),
                power: Some(true),
                active_address: None,
            }),
        };
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["id"], "wall");
        assert_eq!(json["health"], "Offline");
        assert_eq!(json["detail"]["brightness"], 70);
        assert_eq!(json["detail"]["power"], true);
    }

    proptest! {
        #[test]
        fn prop_scaling_never_exceeds_base(r: u8, g: u8, b: u8, w: u8, level in 0u8..=100) {
            let color = Rgbw::new(r, g, b, w);
            let out = color.scaled(level);
            prop_assert!(out[0] <= r && out[1] <= g && out[2] <= b && out[3] <= w);
        }

        #[test]
        fn prop_scaling_is_monotonic(c: u8, level in 0u8..100) {
            let color = Rgbw::new(c, c, c, c);
            prop_assert!(color.scaled(level)[0] <= color.scaled(level + 1)[0]);
        }
    }
}
