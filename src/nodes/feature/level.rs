//! Frame level descriptors

use crate::error::InputViolation;
use crate::node::{Algorithm, Inputs, Outputs, ProcessContext};

#[inline]
fn energy(frame: &[f32]) -> f32 {
    frame.iter().map(|x| x * x).sum()
}

/// Root mean square of each frame.
///
/// Ports: `array` in, `rms` out.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rms;

impl Rms {
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for Rms {
    fn kind(&self) -> &'static str {
        "Rms"
    }

    fn inputs(&self) -> &[&'static str] {
        &["array"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["rms"]
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let frame = inputs.pop_nonempty(0)?;
        outputs.push(0, (energy(&frame) / frame.len() as f32).sqrt());
        Ok(())
    }
}

/// Sum of squares of each frame.
///
/// Ports: `array` in, `energy` out.
#[derive(Clone, Copy, Debug, Default)]
pub struct Energy;

impl Energy {
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for Energy {
    fn kind(&self) -> &'static str {
        "Energy"
    }

    fn inputs(&self) -> &[&'static str] {
        &["array"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["energy"]
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let frame = inputs.pop_nonempty(0)?;
        outputs.push(0, energy(&frame));
        Ok(())
    }
}

/// Mean of squares of each frame.
///
/// Ports: `array` in, `power` out.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstantPower;

impl InstantPower {
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for InstantPower {
    fn kind(&self) -> &'static str {
        "InstantPower"
    }

    fn inputs(&self) -> &[&'static str] {
        &["array"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["power"]
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let frame = inputs.pop_nonempty(0)?;
        outputs.push(0, energy(&frame) / frame.len() as f32);
        Ok(())
    }
}
