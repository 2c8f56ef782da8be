//! Bridge counters.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Frame and byte counters shared by the notifier and the main loop.
#[derive(Debug, Default)]
pub struct BridgeStats {
    frames_received: AtomicU64,
    frames_forwarded: AtomicU64,
    frames_ignored: AtomicU64,
    frames_sent: AtomicU64,
    bytes_from_device: AtomicU64,
    bytes_to_device: AtomicU64,
    error_count: AtomicU64,
    last_error: RwLock<Option<String>>,
}

/// Point-in-time copy of [`BridgeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Frames pulled off the bus, any ID.
    pub frames_received: u64,
    /// Console frames written to stdout.
    pub frames_forwarded: u64,
    /// Frames dropped by the ID filter.
    pub frames_ignored: u64,
    /// Console frames sent to the device.
    pub frames_sent: u64,
    /// Payload bytes written to stdout.
    pub bytes_from_device: u64,
    /// Payload bytes read from stdin and sent.
    pub bytes_to_device: u64,
    /// Errors recorded (receive, stdout, send).
    pub error_count: u64,
}

impl BridgeStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_forwarded(&self, bytes: usize) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
        self.bytes_from_device
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_ignored(&self) {
        self.frames_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_to_device.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self, error: impl Display) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(error.to_string());
    }

    /// Most recent error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            frames_ignored: self.frames_ignored.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_from_device: self.bytes_from_device.load(Ordering::Relaxed),
            bytes_to_device: self.bytes_to_device.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }
}
