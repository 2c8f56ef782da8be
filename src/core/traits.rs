//! Core traits for the bridge.
//!
//! # Seams
//!
//! ```text
//! CanBus         // transport: send + non-blocking receive
//! FrameListener  // notifier callback, invoked once per received frame
//! ConsoleSource  // zero-timeout readiness check + single bounded read
//! ```

use std::io;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::frame::CanMessage;

/// Connection state of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Bus not opened or notifier stopped.
    #[default]
    Disconnected,

    /// Bus open and notifier running.
    Connected,

    /// A fatal error ended the bridge.
    Error,
}

impl ConnectionState {
    /// Check if currently connected.
    #[inline]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
            Self::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// A CAN bus handle.
///
/// `send` and `try_recv` may be called concurrently from different tasks;
/// implementations rely on the underlying transport for that guarantee and
/// add no locking of their own beyond what they need internally.
pub trait CanBus: Send + Sync {
    /// Human-readable name of the bus (interface and channel).
    fn name(&self) -> &str;

    /// Transmit one frame.
    ///
    /// May block the calling thread while the transport's queue is full,
    /// for a bounded time.
    fn send(&self, frame: &CanMessage) -> Result<()>;

    /// Receive one frame if available, without blocking.
    fn try_recv(&self) -> Result<Option<CanMessage>>;
}

/// Callback invoked by the notifier for every received frame.
///
/// Runs on the notifier task, concurrently with the main loop.
pub trait FrameListener: Send + Sync {
    /// Handle one received frame.
    fn on_frame(&self, frame: &CanMessage) -> Result<()>;
}

/// Outcome of one poll of a console source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Nothing ready.
    Idle,
    /// `n` bytes were read into the buffer (`n > 0`).
    Data(usize),
    /// End of input.
    Closed,
}

/// A byte source polled by the main loop.
pub trait ConsoleSource: Send {
    /// Check readiness without waiting and, if ready, perform one read of at
    /// most `buf.len()` bytes.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome>;
}

/// Bridge diagnostics information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Bus name.
    pub bus: String,

    /// Connection state.
    pub connection_state: ConnectionState,

    /// Frames received from the bus (any ID).
    pub read_count: u64,

    /// Frames sent on the bus.
    pub write_count: u64,

    /// Number of errors.
    pub error_count: u64,

    /// Last error message.
    pub last_error: Option<String>,

    /// Bridge-specific counters.
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl Diagnostics {
    /// Create new diagnostics.
    pub fn new(bus: impl Into<String>) -> Self {
        Self {
            bus: bus.into(),
            connection_state: ConnectionState::Disconnected,
            read_count: 0,
            write_count: 0,
            error_count: 0,
            last_error: None,
            extra: serde_json::Value::Null,
        }
    }
}
