//! # CC16 console
//!
//! Host-side tools for the MRS CC16 controller.
//!
//! ## Features
//!
//! - **Console bridge**: relay a device console carried on two reserved
//!   extended CAN IDs to the local stdin/stdout, so serial-console tools
//!   can talk to the board over CAN
//! - **Pin table**: typed handles for every CC16 pin bound to a pluggable
//!   platform driver
//! - **Transports**: Linux SocketCAN and an in-process virtual bus
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cc16_console::prelude::*;
//!
//! let config = BridgeConfig::new("socketcan").with_channel("can0");
//! let bus = cc16_console::bus::open(&config)?;
//!
//! let mut bridge = ConsoleBridge::new(config, bus);
//! bridge.forward_to(std::io::stdout());
//! bridge.run(StdinSource::new()?, shutdown).await?;
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `socketcan` | yes | Linux SocketCAN transport |
//! | `tracing-support` | yes | Logging through `tracing` and the `canproxy` binary |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod board;
pub mod bridge;
pub mod bus;
pub mod core;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::board::{Cc16Pins, PinDriver, PinError};
    #[cfg(unix)]
    pub use crate::bridge::StdinSource;
    pub use crate::bridge::{BridgeConfig, ConsoleBridge, PumpOutcome, StdoutForwarder};
    pub use crate::core::{
        error::{BridgeError, Result},
        frame::*,
        traits::*,
    };
}

// Re-export core types at crate root for convenience
pub use crate::bridge::{BridgeConfig, ConsoleBridge};
pub use crate::core::error::{BridgeError, Result};
pub use crate::core::frame::{CanMessage, ConsoleChannel, FROM_DEVICE_ID, TO_DEVICE_ID};
pub use crate::core::traits::{CanBus, ConnectionState};
