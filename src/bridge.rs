//! CAN ↔ stdio console bridge.
//!
//! Relays opaque byte chunks between a CAN bus and the process's standard
//! streams:
//!
//! - **Inbound** (bus → stdout): a [`Notifier`] task polls the bus and hands
//!   every frame to its listeners; [`StdoutForwarder`] writes the payload of
//!   frames tagged `FROM_DEVICE_ID` and flushes, dropping everything else.
//! - **Outbound** (stdin → bus): [`ConsoleBridge::run`] polls stdin with a
//!   zero-timeout readiness check and sends each read of up to 8 bytes as
//!   one frame tagged `TO_DEVICE_ID`.
//!
//! There is no framing: a message longer than 8 bytes is split across
//! frames and the receiver cannot tell where it ends.
//!
//! # Example
//!
//! ```rust,ignore
//! use cc16_console::bridge::{BridgeConfig, ConsoleBridge, StdinSource};
//!
//! let config = BridgeConfig::new("socketcan").with_channel("can0");
//! let bus = cc16_console::bus::open(&config)?;
//!
//! let mut bridge = ConsoleBridge::new(config, bus);
//! bridge.forward_to(std::io::stdout());
//! bridge
//!     .run(StdinSource::new()?, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! ```

mod config;
mod notifier;
mod proxy;
mod stats;
mod stdio;

pub use config::{BridgeConfig, DEFAULT_BITRATE_KBPS};
pub use notifier::Notifier;
pub use proxy::{ConsoleBridge, PumpOutcome};
pub use stats::{BridgeStats, StatsSnapshot};
#[cfg(unix)]
pub use stdio::StdinSource;
pub use stdio::StdoutForwarder;
