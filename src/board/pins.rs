//! Pin handles, mode constants and the driver seam.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pin operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PinError {
    /// The pin table says this pin cannot do that.
    #[error("{pin} does not support {operation}")]
    Unsupported {
        pin: &'static str,
        operation: &'static str,
    },

    /// Raw value outside the allowed set.
    #[error("invalid {kind} value: {value}")]
    InvalidValue { kind: &'static str, value: u32 },

    /// Failure reported by the platform driver.
    #[error("pin driver error: {0}")]
    Driver(String),
}

/// Result type for pin operations.
pub type PinResult<T> = std::result::Result<T, PinError>;

macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident = $raw:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $raw,)+
        }

        impl $name {
            /// Raw value used by the board runtime.
            pub const fn raw(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = PinError;

            fn try_from(raw: u8) -> PinResult<Self> {
                match raw {
                    $($raw => Ok(Self::$variant),)+
                    _ => Err(PinError::InvalidValue {
                        kind: $kind,
                        value: u32::from(raw),
                    }),
                }
            }
        }
    };
}

raw_enum! {
    /// Operating mode of an output pin.
    OutputMode, "output mode" {
        #[default]
        Digital = 0,
        Pwm = 1,
        AnalogIn = 2,
    }
}

raw_enum! {
    /// Operating mode of an input pin.
    InputMode, "input mode" {
        AnalogIn = 0,
        #[default]
        Digital = 1,
    }
}

raw_enum! {
    /// Pull resistor setting.
    Pull, "pull" {
        #[default]
        None = 0,
        Up = 1,
        Down = 2,
    }
}

raw_enum! {
    /// Input measurement range.
    Range, "range" {
        #[default]
        V16 = 0,
        V32 = 1,
    }
}

raw_enum! {
    /// Reference-voltage generator level.
    ///
    /// `V8_5` is accepted but does not work on current hardware.
    VrefLevel, "Vref level" {
        #[default]
        None = 0,
        V5 = 1,
        V8_5 = 2,
        V10 = 3,
    }
}

impl VrefLevel {
    /// Nominal output in millivolts.
    pub const fn nominal_mv(self) -> u32 {
        match self {
            Self::None => 0,
            Self::V5 => 5_000,
            Self::V8_5 => 8_500,
            Self::V10 => 10_000,
        }
    }
}

/// Where an input's pull resistors live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullKind {
    /// No configurable pull.
    Fixed,
    /// Board-level resistors switched by the controller.
    External,
    /// Controller-internal pull.
    Internal,
}

/// Capabilities of one output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputDef {
    pub name: &'static str,
    pub index: u8,
    pub pwm: bool,
    pub analog_in: bool,
    /// Voltage and current sense.
    pub sense: bool,
    pub note: Option<&'static str>,
}

/// Capabilities of one input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputDef {
    pub name: &'static str,
    pub index: u8,
    pub analog: bool,
    pub pull: PullKind,
    pub range_select: bool,
    /// Readings are only valid with `POWER` on.
    pub requires_power: bool,
}

/// Platform driver performing the actual pin operations.
///
/// Indices are the fixed indices from the pin table; handles never pass
/// anything else.
pub trait PinDriver: Send + Sync {
    fn set_output_mode(&self, index: u8, mode: OutputMode) -> PinResult<()>;
    fn output_mode(&self, index: u8) -> PinResult<OutputMode>;
    fn set_output(&self, index: u8, on: bool) -> PinResult<()>;
    fn output(&self, index: u8) -> PinResult<bool>;

    /// Invert the output. Drivers with a native toggle should override this.
    fn toggle_output(&self, index: u8) -> PinResult<()> {
        let on = self.output(index)?;
        self.set_output(index, !on)
    }

    /// Duty cycle in percent, `0..=100`.
    fn set_duty(&self, index: u8, percent: u8) -> PinResult<()>;
    fn output_voltage_mv(&self, index: u8) -> PinResult<u32>;
    fn output_current_ma(&self, index: u8) -> PinResult<u32>;

    fn set_input_mode(&self, index: u8, mode: InputMode) -> PinResult<()>;
    fn input_mode(&self, index: u8) -> PinResult<InputMode>;
    fn input(&self, index: u8) -> PinResult<bool>;
    fn input_voltage_mv(&self, index: u8) -> PinResult<u32>;
    fn set_pull(&self, index: u8, pull: Pull) -> PinResult<()>;
    fn pull(&self, index: u8) -> PinResult<Pull>;
    fn set_range(&self, index: u8, range: Range) -> PinResult<()>;
    fn range(&self, index: u8) -> PinResult<Range>;

    fn set_vref(&self, level: VrefLevel) -> PinResult<()>;
    fn vref(&self) -> PinResult<VrefLevel>;
    fn vref_voltage_mv(&self) -> PinResult<u32>;
}

/// Output pin handle.
pub struct Output<D: ?Sized> {
    driver: Arc<D>,
    def: &'static OutputDef,
}

impl<D: ?Sized> Clone for Output<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            def: self.def,
        }
    }
}

impl<D: PinDriver + ?Sized> Output<D> {
    pub fn new(driver: Arc<D>, def: &'static OutputDef) -> Self {
        Self { driver, def }
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn index(&self) -> u8 {
        self.def.index
    }

    pub fn def(&self) -> &'static OutputDef {
        self.def
    }

    fn unsupported(&self, operation: &'static str) -> PinError {
        PinError::Unsupported {
            pin: self.def.name,
            operation,
        }
    }

    pub fn mode(&self) -> PinResult<OutputMode> {
        self.driver.output_mode(self.def.index)
    }

    pub fn set_mode(&self, mode: OutputMode) -> PinResult<()> {
        match mode {
            OutputMode::Pwm if !self.def.pwm => return Err(self.unsupported("PWM")),
            OutputMode::AnalogIn if !self.def.analog_in => {
                return Err(self.unsupported("analog input"))
            }
            _ => {}
        }
        self.driver.set_output_mode(self.def.index, mode)
    }

    pub fn on(&self) -> PinResult<()> {
        self.driver.set_output(self.def.index, true)
    }

    pub fn off(&self) -> PinResult<()> {
        self.driver.set_output(self.def.index, false)
    }

    pub fn toggle(&self) -> PinResult<()> {
        self.driver.toggle_output(self.def.index)
    }

    pub fn is_on(&self) -> PinResult<bool> {
        self.driver.output(self.def.index)
    }

    /// Set the PWM duty cycle in percent.
    pub fn set_duty(&self, percent: u8) -> PinResult<()> {
        if !self.def.pwm {
            return Err(self.unsupported("PWM"));
        }
        if percent > 100 {
            return Err(PinError::InvalidValue {
                kind: "duty cycle",
                value: u32::from(percent),
            });
        }
        self.driver.set_duty(self.def.index, percent)
    }

    /// Pin voltage in mV. Misleading in PWM mode.
    pub fn voltage_mv(&self) -> PinResult<u32> {
        if !self.def.sense {
            return Err(self.unsupported("voltage measurement"));
        }
        self.driver.output_voltage_mv(self.def.index)
    }

    /// Pin current in mA. Only meaningful in digital mode.
    pub fn current_ma(&self) -> PinResult<u32> {
        if !self.def.sense {
            return Err(self.unsupported("current measurement"));
        }
        self.driver.output_current_ma(self.def.index)
    }
}

/// Input pin handle.
pub struct Input<D: ?Sized> {
    driver: Arc<D>,
    def: &'static InputDef,
}

impl<D: ?Sized> Clone for Input<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            def: self.def,
        }
    }
}

impl<D: PinDriver + ?Sized> Input<D> {
    pub fn new(driver: Arc<D>, def: &'static InputDef) -> Self {
        Self { driver, def }
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn index(&self) -> u8 {
        self.def.index
    }

    pub fn def(&self) -> &'static InputDef {
        self.def
    }

    fn unsupported(&self, operation: &'static str) -> PinError {
        PinError::Unsupported {
            pin: self.def.name,
            operation,
        }
    }

    pub fn mode(&self) -> PinResult<InputMode> {
        self.driver.input_mode(self.def.index)
    }

    pub fn set_mode(&self, mode: InputMode) -> PinResult<()> {
        if mode == InputMode::AnalogIn && !self.def.analog {
            return Err(self.unsupported("analog mode"));
        }
        self.driver.set_input_mode(self.def.index, mode)
    }

    /// Logic level. Digital mode only.
    pub fn get(&self) -> PinResult<bool> {
        self.driver.input(self.def.index)
    }

    pub fn voltage_mv(&self) -> PinResult<u32> {
        if !self.def.analog {
            return Err(self.unsupported("analog input"));
        }
        self.driver.input_voltage_mv(self.def.index)
    }

    pub fn pull(&self) -> PinResult<Pull> {
        self.driver.pull(self.def.index)
    }

    pub fn set_pull(&self, pull: Pull) -> PinResult<()> {
        if self.def.pull == PullKind::Fixed {
            return Err(self.unsupported("pull change"));
        }
        self.driver.set_pull(self.def.index, pull)
    }

    pub fn range(&self) -> PinResult<Range> {
        if !self.def.range_select {
            return Err(self.unsupported("range change"));
        }
        self.driver.range(self.def.index)
    }

    pub fn set_range(&self, range: Range) -> PinResult<()> {
        if !self.def.range_select {
            return Err(self.unsupported("range change"));
        }
        self.driver.set_range(self.def.index, range)
    }
}

/// Reference-voltage generator handle.
pub struct Vref<D: ?Sized> {
    driver: Arc<D>,
}

impl<D: ?Sized> Clone for Vref<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
        }
    }
}

impl<D: PinDriver + ?Sized> Vref<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self { driver }
    }

    pub fn level(&self) -> PinResult<VrefLevel> {
        self.driver.vref()
    }

    pub fn set_level(&self, level: VrefLevel) -> PinResult<()> {
        if level == VrefLevel::V8_5 {
            #[cfg(feature = "tracing-support")]
            tracing::warn!("Vref 8.5 V is not functional on CC16 hardware");
        }
        self.driver.set_vref(level)
    }

    /// Measured generator output in mV.
    pub fn voltage_mv(&self) -> PinResult<u32> {
        self.driver.vref_voltage_mv()
    }
}
