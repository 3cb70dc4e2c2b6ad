//! DC offset removal

use core::f32::consts::TAU;

use crate::error::InputViolation;
use crate::node::{Algorithm, Inputs, Outputs, ProcessContext};

const DEFAULT_CUTOFF: f32 = 40.0;

/// First-order high-pass that strips DC offset from a sample stream.
///
/// `y[n] = x[n] - x[n-1] + r * y[n-1]` with `r = exp(-2π fc / sr)`.
/// Filter memory carries across blocks and ticks.
///
/// Ports: `signal` in, `signal` out.
pub struct DcRemoval {
    cutoff: f32,
    /// Pole radius, derived from the sample rate on first use
    r: Option<(u32, f32)>,
    x1: f32,
    y1: f32,
}

impl DcRemoval {
    /// Cutoff at 40 Hz.
    pub fn new() -> Self {
        Self::with_cutoff(DEFAULT_CUTOFF)
    }

    pub fn with_cutoff(cutoff: f32) -> Self {
        Self {
            cutoff: cutoff.max(0.0),
            r: None,
            x1: 0.0,
            y1: 0.0,
        }
    }

    #[inline]
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    fn pole(&mut self, sample_rate: u32) -> f32 {
        match self.r {
            Some((sr, r)) if sr == sample_rate => r,
            _ => {
                let r = (-TAU * self.cutoff / sample_rate.max(1) as f32).exp();
                self.r = Some((sample_rate, r));
                r
            }
        }
    }
}

impl Default for DcRemoval {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for DcRemoval {
    fn kind(&self) -> &'static str {
        "DcRemoval"
    }

    fn inputs(&self) -> &[&'static str] {
        &["signal"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["signal"]
    }

    fn process(
        &mut self,
        ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let mut block = inputs.pop_vector(0)?;
        let r = self.pole(ctx.sample_rate);

        let (mut x1, mut y1) = (self.x1, self.y1);
        for s in block.iter_mut() {
            let x = *s;
            let y = x - x1 + r * y1;
            x1 = x;
            y1 = y;
            *s = y;
        }
        self.x1 = x1;
        self.y1 = y1;

        outputs.push(0, block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::VecDeque;

    #[test]
    fn constant_offset_decays() {
        let ctx = ProcessContext {
            sample_rate: 8000,
            frame_size: 256,
            hop_size: 256,
        };
        let mut dc = DcRemoval::new();
        let mut last = Vec::new();

        // 20 blocks of pure DC; filter memory must carry between them.
        for _ in 0..20 {
            let mut queues = vec![VecDeque::from([Value::Vector(vec![1.0; 256])])];
            let mut pending = Vec::new();
            let mut inputs = Inputs::new(&mut queues);
            let mut outputs = Outputs::new(&mut pending, 1);
            dc.process(&ctx, &mut inputs, &mut outputs).unwrap();
            last = pending.pop().unwrap().1.as_slice().to_vec();
        }

        assert!(last.iter().all(|s| s.abs() < 1e-3), "{:?}", &last[..4]);
    }
}
