//! Error types for device transport operations.
//!
//! Transport adapters report failures as [`HardwareError`]. Modules convert
//! them into the domain error at their boundary; during health probes they are
//! classified into a probe outcome instead and never leave the module.

use roomctl_network::{DmxError, HttpClientError, LineClientError};

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to a device.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or did not answer.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The device answered but rejected the request.
    #[error("Device error: {message}")]
    DeviceError { message: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// Device configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    pub fn device(message: impl Into<String>) -> Self {
        Self::DeviceError {
            message: message.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// `true` when the device answered; the link itself is fine.
    pub fn is_device_reply(&self) -> bool {
        matches!(self, Self::DeviceError { .. } | Self::InvalidData { .. })
    }
}

impl From<LineClientError> for HardwareError {
    fn from(e: LineClientError) -> Self {
        match e {
            LineClientError::ConnectionTimeout(ms)
            | LineClientError::ReadTimeout(ms)
            | LineClientError::WriteTimeout(ms) => Self::timeout(ms),
            LineClientError::NotConnected => Self::disconnected("not connected"),
            LineClientError::ConnectionLost(msg) => Self::disconnected(msg),
            LineClientError::Io(e) => Self::Io(e),
        }
    }
}

impl From<HttpClientError> for HardwareError {
    fn from(e: HttpClientError) -> Self {
        match e {
            HttpClientError::Unreachable(msg) => Self::disconnected(msg),
            HttpClientError::Status(code) => Self::device(format!("HTTP {code}")),
            HttpClientError::Decode(msg) => Self::invalid_data(msg),
            HttpClientError::Client(msg) => Self::communication(msg),
        }
    }
}

impl From<DmxError> for HardwareError {
    fn from(e: DmxError) -> Self {
        match e {
            DmxError::Open { .. } => Self::initialization_failed(e.to_string()),
            DmxError::ChannelOutOfRange(_) => Self::configuration(e.to_string()),
            DmxError::Write(_) | DmxError::Closed => Self::communication(e.to_string()),
        }
    }
}

impl From<HardwareError> for roomctl_core::Error {
    fn from(e: HardwareError) -> Self {
        match e {
            HardwareError::Timeout { duration_ms } => Self::Timeout(duration_ms),
            HardwareError::ConfigurationError { message } => Self::Config(message),
            other => Self::Transport(other.to_string()),
        }
    }
}
