//! Logging infrastructure for the console bridge.
//!
//! Log output always goes to stderr: stdout carries console bytes from the
//! device and must stay clean.
//!
//! # Example
//!
//! ```ignore
//! use cc16_console::core::logging::{init_tracing, FrameTracer};
//!
//! init_tracing(1)?;                   // info level unless RUST_LOG is set
//! bridge.add_listener(Arc::new(FrameTracer));
//! ```

use crate::core::frame::CanMessage;

// ============================================================================
// Packet Direction
// ============================================================================

/// Direction of a frame relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketDirection {
    /// Frame sent to the bus.
    Send,
    /// Frame received from the bus.
    Receive,
}

impl std::fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send => write!(f, ">>>"),
            Self::Receive => write!(f, "<<<"),
        }
    }
}

/// Upper-case hex rendering of a payload, no separators.
pub fn hex_string(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

/// One-line rendering of a frame, e.g. `>>> 1FFFFFFD [3] 010203`.
pub fn format_frame(direction: PacketDirection, frame: &CanMessage) -> String {
    use embedded_can::Frame;

    let width = if frame.is_extended() { 8 } else { 3 };
    format!(
        "{} {:0width$X} [{}] {}",
        direction,
        frame.raw_id(),
        frame.dlc(),
        hex_string(frame.data()),
        width = width
    )
}

// ============================================================================
// Tracing integration
// ============================================================================

/// Trace a single frame.
#[cfg(feature = "tracing-support")]
pub fn trace_frame(direction: PacketDirection, frame: &CanMessage) {
    use embedded_can::Frame;

    tracing::trace!(
        direction = %direction,
        id = %format!("0x{:08X}", frame.raw_id()),
        extended = frame.is_extended(),
        size = frame.dlc(),
        data = %hex_string(frame.data()),
        "CAN frame"
    );
}

/// No-op when tracing is compiled out.
#[cfg(not(feature = "tracing-support"))]
pub fn trace_frame(_direction: PacketDirection, _frame: &CanMessage) {}

/// Frame listener that traces every received frame, console or not.
#[cfg(feature = "tracing-support")]
pub struct FrameTracer;

#[cfg(feature = "tracing-support")]
impl crate::core::traits::FrameListener for FrameTracer {
    fn on_frame(&self, frame: &CanMessage) -> crate::core::error::Result<()> {
        trace_frame(PacketDirection::Receive, frame);
        Ok(())
    }
}

/// Map a `-v` count to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `verbosity` when set.
#[cfg(feature = "tracing-support")]
pub fn init_tracing(verbosity: u8) -> crate::core::error::Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| crate::core::error::BridgeError::config(format!("logging: {}", e)))
}

// ============================================================================
// Tests
// ============================================================================
