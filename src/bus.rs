//! CAN bus transports.
//!
//! - `SocketCanBus`: Linux SocketCAN (feature `socketcan`, Linux only)
//! - `VirtualBus`: in-process bus, buses on the same channel see each other
//!
//! # Example
//!
//! ```rust,ignore
//! use cc16_console::bridge::BridgeConfig;
//!
//! let config = BridgeConfig::new("socketcan").with_channel("can0");
//! let bus = cc16_console::bus::open(&config)?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::bridge::BridgeConfig;
use crate::core::error::{BridgeError, Result};
use crate::core::traits::CanBus;

#[cfg(all(feature = "socketcan", target_os = "linux"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "socketcan", target_os = "linux"))))]
mod socket;
mod virtual_bus;

#[cfg(all(feature = "socketcan", target_os = "linux"))]
pub use socket::SocketCanBus;
pub use virtual_bus::VirtualBus;

/// Channel used when `--channel` is empty on SocketCAN.
pub const DEFAULT_SOCKETCAN_CHANNEL: &str = "can0";

/// Transport selected by `--interface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusInterface {
    /// Linux SocketCAN; channel is the network device (`can0`, `vcan0`).
    SocketCan,
    /// In-process virtual bus; channel is an arbitrary group name.
    Virtual,
}

impl BusInterface {
    /// Canonical interface name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SocketCan => "socketcan",
            Self::Virtual => "virtual",
        }
    }
}

impl fmt::Display for BusInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusInterface {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("socketcan") {
            Ok(Self::SocketCan)
        } else if s.eq_ignore_ascii_case("virtual") {
            Ok(Self::Virtual)
        } else {
            Err(BridgeError::unsupported(format!(
                "CAN interface '{}' (available: socketcan, virtual)",
                s
            )))
        }
    }
}

/// Open the bus described by `config`.
///
/// Any failure here is fatal for the bridge; the driver error is carried in
/// [`BridgeError::BusOpen`].
pub fn open(config: &BridgeConfig) -> Result<Arc<dyn CanBus>> {
    let interface: BusInterface = config.interface.parse()?;

    #[cfg(feature = "tracing-support")]
    tracing::info!(
        interface = %interface,
        channel = %config.channel,
        bitrate = config.bitrate_bps(),
        "Opening CAN bus"
    );

    match interface {
        BusInterface::SocketCan => open_socketcan(config),
        BusInterface::Virtual => Ok(Arc::new(VirtualBus::open(&config.channel))),
    }
}

#[cfg(all(feature = "socketcan", target_os = "linux"))]
fn open_socketcan(config: &BridgeConfig) -> Result<Arc<dyn CanBus>> {
    let channel = if config.channel.is_empty() {
        DEFAULT_SOCKETCAN_CHANNEL
    } else {
        config.channel.as_str()
    };
    Ok(Arc::new(SocketCanBus::open(channel, config.bitrate_bps())?))
}

#[cfg(not(all(feature = "socketcan", target_os = "linux")))]
fn open_socketcan(_config: &BridgeConfig) -> Result<Arc<dyn CanBus>> {
    Err(BridgeError::unsupported(
        "SocketCAN requires Linux and the `socketcan` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_parse() {
        assert_eq!(
            "socketcan".parse::<BusInterface>().unwrap(),
            BusInterface::SocketCan
        );
        assert_eq!(
            "Virtual".parse::<BusInterface>().unwrap(),
            BusInterface::Virtual
        );
        assert!(matches!(
            "anagate".parse::<BusInterface>(),
            Err(BridgeError::Unsupported(_))
        ));
    }

    #[test]
    fn test_open_virtual() {
        let config = BridgeConfig::new("virtual").with_channel("bus-open-test");
        let bus = open(&config).unwrap();
        assert_eq!(bus.name(), "virtual:bus-open-test");
    }

    #[test]
    fn test_open_unknown_interface_fails() {
        let config = BridgeConfig::new("pcan");
        assert!(open(&config).is_err());
    }

    #[cfg(all(feature = "socketcan", target_os = "linux"))]
    #[test]
    fn test_open_missing_socketcan_device_fails() {
        let config = BridgeConfig::new("socketcan").with_channel("nosuchcan42");
        match open(&config) {
            Err(BridgeError::BusOpen { interface, .. }) => assert_eq!(interface, "nosuchcan42"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opening a missing device must fail"),
        }
    }
}
