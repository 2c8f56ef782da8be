//! Pin mapping for the MRS CC16 controller.
//!
//! The board's pins are exposed as typed handles ([`Output`], [`Input`],
//! [`Vref`]) bound to a fixed index in a platform driver. Hardware access is
//! entirely the driver's job ([`PinDriver`]); handles only refuse what the
//! pin table says a pin cannot do.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cc16_console::board::{Cc16Pins, OutputMode, SimDriver};
//!
//! let pins = Cc16Pins::new(Arc::new(SimDriver::new()));
//! pins.out3.set_mode(OutputMode::Pwm).unwrap();
//! pins.out3.set_duty(40).unwrap();
//! assert!(pins.power.set_mode(OutputMode::Pwm).is_err());
//! ```

pub mod cc16;
mod pins;
mod sim;

pub use cc16::Cc16Pins;
pub use pins::{
    Input, InputMode, InputDef, Output, OutputMode, OutputDef, PinDriver, PinError, PinResult,
    Pull, PullKind, Range, Vref, VrefLevel,
};
pub use sim::SimDriver;
