//! Error types for Bhraman

use thiserror::Error;

/// Bhraman error type
#[derive(Error, Debug)]
pub enum BhramanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Unregistering an event that is not currently registered
    #[error("Event not subscribed: {0}")]
    NotSubscribed(String),

    /// Event delivered under a name no reaction is bound to
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Malformed payload for event {event}: {reason}")]
    MalformedEvent { event: String, reason: String },

    #[error("Host error: {0}")]
    Host(String),
}

impl From<toml::de::Error> for BhramanError {
    fn from(e: toml::de::Error) -> Self {
        BhramanError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BhramanError>;
