//! Core abstractions for the console bridge.
//!
//! This module provides the frame model, the transport and listener traits,
//! the error type, and logging helpers shared by the bridge and the tools.

pub mod error;
pub mod frame;
pub mod logging;
#[cfg(unix)]
pub mod readiness;
pub mod traits;

pub use error::{BridgeError, Result};
pub use frame::*;
pub use traits::*;
