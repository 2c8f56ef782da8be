//! Error types for the console bridge.

use thiserror::Error;

/// Errors raised by the bridge and its transports.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid configuration (bad interface name, bad arguments).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The CAN interface could not be opened.
    #[error("Failed to open CAN interface '{interface}': {source}")]
    BusOpen {
        /// Interface/channel that was being opened.
        interface: String,
        /// Underlying driver error.
        #[source]
        source: std::io::Error,
    },

    /// Sending a frame on the bus failed.
    #[error("Failed to send CAN frame: {0}")]
    Send(#[source] std::io::Error),

    /// Receiving from the bus failed.
    #[error("Failed to receive CAN frame: {0}")]
    Receive(#[source] std::io::Error),

    /// Requested feature is not available in this build or on this platform.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Operation requires a running bridge.
    #[error("Bridge is not connected")]
    NotConnected,

    /// Standard stream I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unsupported-feature error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Whether this error ends the bridge (everything except receive hiccups).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Receive(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
