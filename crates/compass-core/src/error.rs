use thiserror::Error;

use crate::access::{Permission, Role};

/// Top-level error type for Strategic Compass.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for CompassError` so that `?` works across crate
/// boundaries in the binary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompassError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Permission denied: role '{role}' lacks '{permission}'")]
    PermissionDenied { role: Role, permission: Permission },

    #[error("Chat error: {0}")]
    Chat(String),
}

impl From<toml::de::Error> for CompassError {
    fn from(err: toml::de::Error) -> Self {
        CompassError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CompassError {
    fn from(err: toml::ser::Error) -> Self {
        CompassError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CompassError {
    fn from(err: serde_json::Error) -> Self {
        CompassError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Strategic Compass operations.
pub type Result<T> = std::result::Result<T, CompassError>;
