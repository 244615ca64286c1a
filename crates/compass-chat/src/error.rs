//! Error types for the strategy chat.

use compass_core::error::CompassError;

use crate::state::ResponsePhase;

/// Errors from the chat engine.
///
/// Matching, fallback generation and suggestions are total and never fail;
/// these variants cover catalog loading, the single-flight rule and export.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("a response is already in flight")]
    ResponseInFlight,
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: ResponsePhase,
        to: ResponsePhase,
    },
    #[error("conversation state lock poisoned")]
    StatePoisoned,
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("export error: {0}")]
    Export(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        ChatError::Catalog(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Export(err.to_string())
    }
}

impl From<ChatError> for CompassError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Io(e) => CompassError::Io(e),
            other => CompassError::Chat(other.to_string()),
        }
    }
}
