//! Parameter validation shared by every device module.
//!
//! Each check returns the value converted to the type the driver works with,
//! or `Error::InvalidParameter` naming the offending field. Modules call these
//! before touching a transport, so an out-of-range request never reaches the
//! wire.

use crate::constants::{
    MAX_BRIGHTNESS, MAX_CHANNEL_VALUE, MAX_PAN, MAX_TILT, MAX_VOLUME, MAX_ZOOM, MIN_BRIGHTNESS,
    MIN_PAN, MIN_TILT, MIN_VOLUME, MIN_ZOOM,
};
use crate::{Error, Result};

fn int_in_range(field: &'static str, value: i32, min: i32, max: i32) -> Result<i32> {
    if !(min..=max).contains(&value) {
        return Err(Error::invalid(
            field,
            format!("must be {min}-{max}, got {value}"),
        ));
    }
    Ok(value)
}

fn float_in_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64> {
    if !value.is_finite() || value < min || value > max {
        return Err(Error::invalid(
            field,
            format!("must be {min} to {max}, got {value}"),
        ));
    }
    Ok(value)
}

/// Brightness in percent.
pub fn brightness(value: i32) -> Result<u8> {
    int_in_range("brightness", value, MIN_BRIGHTNESS, MAX_BRIGHTNESS).map(|v| v as u8)
}

/// Volume in percent.
pub fn volume(value: i32) -> Result<u8> {
    int_in_range("volume", value, MIN_VOLUME, MAX_VOLUME).map(|v| v as u8)
}

/// Relative volume step; zero would be a no-op request and is rejected.
pub fn volume_step(value: i32) -> Result<u8> {
    int_in_range("step", value, 1, MAX_VOLUME).map(|v| v as u8)
}

/// One 8-bit colour channel.
pub fn channel(field: &'static str, value: i32) -> Result<u8> {
    int_in_range(field, value, 0, MAX_CHANNEL_VALUE).map(|v| v as u8)
}

pub fn pan(value: f64) -> Result<f64> {
    float_in_range("pan", value, MIN_PAN, MAX_PAN)
}

pub fn tilt(value: f64) -> Result<f64> {
    float_in_range("tilt", value, MIN_TILT, MAX_TILT)
}

pub fn zoom(value: f64) -> Result<f64> {
    float_in_range("zoom", value, MIN_ZOOM, MAX_ZOOM)
}
