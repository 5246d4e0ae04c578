use crate::types::ModuleKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Lookup errors
    #[error("{kind} device not found: {id}")]
    DeviceNotFound { kind: ModuleKind, id: String },

    #[error("{0} module is not available")]
    ModuleUnavailable(ModuleKind),

    // Validation errors
    #[error("Invalid {field}: {message}")]
    InvalidParameter { field: &'static str, message: String },

    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation timeout after {0}ms")]
    Timeout(u64),

    // Lifecycle errors
    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(kind: ModuleKind, id: impl Into<String>) -> Self {
        Self::DeviceNotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns `true` for errors the control plane reports as a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound { .. } | Self::ModuleUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
