//! Bridge configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bitrate used when `--bitrate` is not given, in kbit/s.
pub const DEFAULT_BITRATE_KBPS: u32 = 500;

/// Console bridge configuration.
///
/// # Example JSON
/// ```json
/// {
///     "interface": "socketcan",
///     "channel": "can0",
///     "bitrate_kbps": 500
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Transport name (`socketcan`, `virtual`).
    pub interface: String,

    /// Interface-specific channel (`can0`, a virtual group name, ...).
    #[serde(default)]
    pub channel: String,

    /// CAN bitrate in kbit/s.
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,

    /// Stdin polling interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub stdin_poll_interval_ms: u64,

    /// Bus receive polling interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub rx_poll_interval_ms: u64,
}

fn default_bitrate_kbps() -> u32 {
    DEFAULT_BITRATE_KBPS
}

fn default_poll_interval_ms() -> u64 {
    1
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new("socketcan")
    }
}

impl BridgeConfig {
    /// Create a configuration for `interface` with default settings.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            channel: String::new(),
            bitrate_kbps: default_bitrate_kbps(),
            stdin_poll_interval_ms: default_poll_interval_ms(),
            rx_poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Set the channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Set the bitrate in kbit/s.
    pub fn with_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = kbps;
        self
    }

    /// Set both polling intervals.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.stdin_poll_interval_ms = ms;
        self.rx_poll_interval_ms = ms;
        self
    }

    /// Bitrate in bit/s.
    pub fn bitrate_bps(&self) -> u32 {
        self.bitrate_kbps.saturating_mul(1000)
    }

    /// Stdin polling period (never zero).
    pub fn stdin_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stdin_poll_interval_ms.max(1))
    }

    /// Bus receive polling period (never zero).
    pub fn rx_poll_interval(&self) -> Duration {
        Duration::from_millis(self.rx_poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_conversion() {
        let config = BridgeConfig::new("socketcan");
        assert_eq!(config.bitrate_kbps, 500);
        assert_eq!(config.bitrate_bps(), 500_000);

        let config = config.with_bitrate_kbps(125);
        assert_eq!(config.bitrate_bps(), 125_000);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: BridgeConfig = serde_json::from_str(r#"{"interface": "virtual"}"#).unwrap();
        assert_eq!(config.interface, "virtual");
        assert_eq!(config.channel, "");
        assert_eq!(config.bitrate_kbps, DEFAULT_BITRATE_KBPS);
        assert_eq!(config.stdin_poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = BridgeConfig::new("virtual").with_poll_interval(Duration::ZERO);
        assert_eq!(config.rx_poll_interval(), Duration::from_millis(1));
        assert_eq!(config.stdin_poll_interval(), Duration::from_millis(1));
    }
}
