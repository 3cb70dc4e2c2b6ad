//! Magnitude spectrum

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::InputViolation;
use crate::node::{Algorithm, Inputs, Outputs, ProcessContext};

/// Magnitude spectrum of each frame, `size / 2 + 1` bins.
///
/// Frames must be exactly `size` samples long. The FFT plan and scratch
/// buffers are allocated once at construction.
///
/// Ports: `frame` in, `spectrum` out.
pub struct Spectrum {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Spectrum {
    /// Zero is raised to one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        Self {
            size,
            input: plan.make_input_vec(),
            output: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }
}

impl Algorithm for Spectrum {
    fn kind(&self) -> &'static str {
        "Spectrum"
    }

    fn inputs(&self) -> &[&'static str] {
        &["frame"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["spectrum"]
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let frame = inputs.pop_exact(0, self.size)?;
        self.input.copy_from_slice(&frame);

        // realfft only rejects buffers of the wrong length.
        self.plan
            .process_with_scratch(&mut self.input, &mut self.output, &mut self.scratch)
            .map_err(|err| {
                tracing::warn!(%err, size = self.size, "fft rejected its buffers");
                InputViolation::WrongLength {
                    port: 0,
                    expected: self.size,
                    got: frame.len(),
                }
            })?;

        let magnitudes: Vec<f32> = self.output.iter().map(|c| c.norm()).collect();
        outputs.push(0, magnitudes);
        Ok(())
    }
}
