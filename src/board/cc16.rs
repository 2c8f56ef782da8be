//! MRS CC16 pin table.

use std::sync::Arc;

use serde::Serialize;

use super::pins::{Input, InputDef, Output, OutputDef, PinDriver, PullKind, Vref};

const fn out(name: &'static str, index: u8) -> OutputDef {
    OutputDef {
        name,
        index,
        pwm: true,
        analog_in: true,
        sense: true,
        note: None,
    }
}

const fn external_in(name: &'static str, index: u8) -> InputDef {
    InputDef {
        name,
        index,
        analog: true,
        pull: PullKind::External,
        range_select: true,
        requires_power: false,
    }
}

const fn internal_in(name: &'static str, index: u8, requires_power: bool) -> InputDef {
    InputDef {
        name,
        index,
        analog: true,
        pull: PullKind::Internal,
        range_select: false,
        requires_power,
    }
}

const fn digital_in(name: &'static str, index: u8) -> InputDef {
    InputDef {
        name,
        index,
        analog: false,
        pull: PullKind::Internal,
        range_select: false,
        requires_power: false,
    }
}

/// Output pins, by driver index.
pub static OUTPUTS: [OutputDef; 9] = [
    out("OUT0", 0),
    out("OUT1", 1),
    out("OUT2", 2),
    out("OUT3", 3),
    out("OUT4", 4),
    out("OUT5", 5),
    out("OUT6", 6),
    out("OUT7", 7),
    OutputDef {
        name: "POWER",
        index: 8,
        pwm: false,
        analog_in: false,
        sense: false,
        note: Some("forces board power on"),
    },
];

/// Input pins, by driver index.
pub static INPUTS: [InputDef; 12] = [
    external_in("IN0", 0),
    external_in("IN1", 1),
    external_in("IN2", 2),
    external_in("IN3", 3),
    external_in("IN4", 4),
    external_in("IN5", 5),
    internal_in("ID", 6, false),
    internal_in("KL30_1", 7, true),
    internal_in("KL30_2", 8, true),
    digital_in("KL15", 9),
    digital_in("INTERFACE2_A", 10),
    digital_in("INTERFACE2_B", 11),
];

/// Every CC16 pin handle, bound to one driver.
pub struct Cc16Pins<D: ?Sized> {
    pub out0: Output<D>,
    pub out1: Output<D>,
    pub out2: Output<D>,
    pub out3: Output<D>,
    pub out4: Output<D>,
    pub out5: Output<D>,
    pub out6: Output<D>,
    pub out7: Output<D>,
    pub power: Output<D>,
    pub in0: Input<D>,
    pub in1: Input<D>,
    pub in2: Input<D>,
    pub in3: Input<D>,
    pub in4: Input<D>,
    pub in5: Input<D>,
    pub id: Input<D>,
    pub kl30_1: Input<D>,
    pub kl30_2: Input<D>,
    pub kl15: Input<D>,
    pub interface2_a: Input<D>,
    pub interface2_b: Input<D>,
    pub vref: Vref<D>,
}

impl<D: PinDriver + ?Sized> Cc16Pins<D> {
    /// Bind every pin to `driver`.
    pub fn new(driver: Arc<D>) -> Self {
        let o = |i: usize| Output::new(Arc::clone(&driver), &OUTPUTS[i]);
        let n = |i: usize| Input::new(Arc::clone(&driver), &INPUTS[i]);

        Self {
            out0: o(0),
            out1: o(1),
            out2: o(2),
            out3: o(3),
            out4: o(4),
            out5: o(5),
            out6: o(6),
            out7: o(7),
            power: o(8),
            in0: n(0),
            in1: n(1),
            in2: n(2),
            in3: n(3),
            in4: n(4),
            in5: n(5),
            id: n(6),
            kl30_1: n(7),
            kl30_2: n(8),
            kl15: n(9),
            interface2_a: n(10),
            interface2_b: n(11),
            vref: Vref::new(Arc::clone(&driver)),
        }
    }

    /// Output handles in index order.
    pub fn outputs(&self) -> [&Output<D>; 9] {
        [
            &self.out0, &self.out1, &self.out2, &self.out3, &self.out4, &self.out5, &self.out6,
            &self.out7, &self.power,
        ]
    }

    /// Input handles in index order.
    pub fn inputs(&self) -> [&Input<D>; 12] {
        [
            &self.in0,
            &self.in1,
            &self.in2,
            &self.in3,
            &self.in4,
            &self.in5,
            &self.id,
            &self.kl30_1,
            &self.kl30_2,
            &self.kl15,
            &self.interface2_a,
            &self.interface2_b,
        ]
    }

    /// Look up an output by name (`OUT3`, `power`).
    pub fn output(&self, name: &str) -> Option<&Output<D>> {
        self.outputs()
            .into_iter()
            .find(|pin| pin.name().eq_ignore_ascii_case(name))
    }

    /// Look up an input by name (`IN0`, `kl15`).
    pub fn input(&self, name: &str) -> Option<&Input<D>> {
        self.inputs()
            .into_iter()
            .find(|pin| pin.name().eq_ignore_ascii_case(name))
    }
}

/// Kind of a table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinKind {
    Output,
    Input,
    Vref,
}

/// One row of the printable pin table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinEntry {
    pub name: &'static str,
    pub kind: PinKind,
    /// Driver index; the Vref generator has none.
    pub index: Option<u8>,
    pub capabilities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

/// Describe the whole table.
pub fn pin_table() -> Vec<PinEntry> {
    let outputs = OUTPUTS.iter().map(|def| {
        let mut caps = vec!["digital"];
        if def.pwm {
            caps.push("pwm");
        }
        if def.analog_in {
            caps.push("analog_in");
        }
        if def.sense {
            caps.extend(["voltage", "current"]);
        }
        PinEntry {
            name: def.name,
            kind: PinKind::Output,
            index: Some(def.index),
            capabilities: caps,
            note: def.note,
        }
    });

    let inputs = INPUTS.iter().map(|def| {
        let mut caps = vec!["digital"];
        if def.analog {
            caps.extend(["analog", "voltage"]);
        }
        match def.pull {
            PullKind::External => caps.push("external_pull"),
            PullKind::Internal => caps.push("internal_pull"),
            PullKind::Fixed => {}
        }
        if def.range_select {
            caps.push("range_16v_32v");
        }
        PinEntry {
            name: def.name,
            kind: PinKind::Input,
            index: Some(def.index),
            capabilities: caps,
            note: def.requires_power.then_some("requires POWER on"),
        }
    });

    let vref = PinEntry {
        name: "Vref",
        kind: PinKind::Vref,
        index: None,
        capabilities: vec!["off", "5v", "8v5", "10v", "voltage"],
        note: Some("8.5 V setting does not work on the hardware"),
    };

    outputs.chain(inputs).chain(std::iter::once(vref)).collect()
}
