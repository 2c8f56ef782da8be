//! In-memory pin driver.
//!
//! Records every setting and returns readings injected by the caller. Used
//! by tests and by `cc16-pins` when no hardware is attached.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use dashmap::DashMap;

use super::pins::{InputMode, OutputMode, PinDriver, PinResult, Pull, Range, VrefLevel};

#[derive(Debug, Clone, Copy, Default)]
struct OutputState {
    mode: OutputMode,
    on: bool,
    duty: u8,
    voltage_mv: u32,
    current_ma: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct InputState {
    mode: InputMode,
    level: bool,
    voltage_mv: u32,
    pull: Pull,
    range: Range,
}

/// Simulated CC16 driver.
#[derive(Debug, Default)]
pub struct SimDriver {
    outputs: DashMap<u8, OutputState>,
    inputs: DashMap<u8, InputState>,
    vref: AtomicU8,
    calls: AtomicU64,
}

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of driver calls made so far.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Last duty cycle written to an output.
    pub fn duty(&self, index: u8) -> u8 {
        self.outputs.get(&index).map(|s| s.duty).unwrap_or_default()
    }

    /// Inject voltage and current readings for an output.
    pub fn set_output_readings(&self, index: u8, voltage_mv: u32, current_ma: u32) {
        let mut state = self.outputs.entry(index).or_default();
        state.voltage_mv = voltage_mv;
        state.current_ma = current_ma;
    }

    /// Inject the logic level of an input.
    pub fn set_input_level(&self, index: u8, level: bool) {
        self.inputs.entry(index).or_default().level = level;
    }

    /// Inject the voltage of an input.
    pub fn set_input_voltage(&self, index: u8, voltage_mv: u32) {
        self.inputs.entry(index).or_default().voltage_mv = voltage_mv;
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    fn read_output<T>(&self, index: u8, f: impl FnOnce(&OutputState) -> T) -> T {
        self.count();
        f(&self.outputs.get(&index).map(|s| *s).unwrap_or_default())
    }

    fn write_output(&self, index: u8, f: impl FnOnce(&mut OutputState)) -> PinResult<()> {
        self.count();
        f(&mut self.outputs.entry(index).or_default());
        Ok(())
    }

    fn read_input<T>(&self, index: u8, f: impl FnOnce(&InputState) -> T) -> T {
        self.count();
        f(&self.inputs.get(&index).map(|s| *s).unwrap_or_default())
    }

    fn write_input(&self, index: u8, f: impl FnOnce(&mut InputState)) -> PinResult<()> {
        self.count();
        f(&mut self.inputs.entry(index).or_default());
        Ok(())
    }
}

impl PinDriver for SimDriver {
    fn set_output_mode(&self, index: u8, mode: OutputMode) -> PinResult<()> {
        self.write_output(index, |s| s.mode = mode)
    }

    fn output_mode(&self, index: u8) -> PinResult<OutputMode> {
        Ok(self.read_output(index, |s| s.mode))
    }

    fn set_output(&self, index: u8, on: bool) -> PinResult<()> {
        self.write_output(index, |s| s.on = on)
    }

    fn output(&self, index: u8) -> PinResult<bool> {
        Ok(self.read_output(index, |s| s.on))
    }

    fn set_duty(&self, index: u8, percent: u8) -> PinResult<()> {
        self.write_output(index, |s| s.duty = percent)
    }

    fn output_voltage_mv(&self, index: u8) -> PinResult<u32> {
        Ok(self.read_output(index, |s| s.voltage_mv))
    }

    fn output_current_ma(&self, index: u8) -> PinResult<u32> {
        Ok(self.read_output(index, |s| s.current_ma))
    }

    fn set_input_mode(&self, index: u8, mode: InputMode) -> PinResult<()> {
        self.write_input(index, |s| s.mode = mode)
    }

    fn input_mode(&self, index: u8) -> PinResult<InputMode> {
        Ok(self.read_input(index, |s| s.mode))
    }

    fn input(&self, index: u8) -> PinResult<bool> {
        Ok(self.read_input(index, |s| s.level))
    }

    fn input_voltage_mv(&self, index: u8) -> PinResult<u32> {
        Ok(self.read_input(index, |s| s.voltage_mv))
    }

    fn set_pull(&self, index: u8, pull: Pull) -> PinResult<()> {
        self.write_input(index, |s| s.pull = pull)
    }

    fn pull(&self, index: u8) -> PinResult<Pull> {
        Ok(self.read_input(index, |s| s.pull))
    }

    fn set_range(&self, index: u8, range: Range) -> PinResult<()> {
        self.write_input(index, |s| s.range = range)
    }

    fn range(&self, index: u8) -> PinResult<Range> {
        Ok(self.read_input(index, |s| s.range))
    }

    fn set_vref(&self, level: VrefLevel) -> PinResult<()> {
        self.count();
        self.vref.store(level.raw(), Ordering::Relaxed);
        Ok(())
    }

    fn vref(&self) -> PinResult<VrefLevel> {
        self.count();
        VrefLevel::try_from(self.vref.load(Ordering::Relaxed))
    }

    fn vref_voltage_mv(&self) -> PinResult<u32> {
        Ok(self.vref()?.nominal_mv())
    }
}
