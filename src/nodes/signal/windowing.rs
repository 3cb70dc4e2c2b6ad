//! Analysis windows

use core::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::error::InputViolation;
use crate::node::{Algorithm, Inputs, Outputs, ProcessContext};

/// Window shape. All windows are periodic, i.e. sized for spectral analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Square,
    #[default]
    Hann,
    Hamming,
    Blackman,
}

impl WindowKind {
    fn coefficient(self, i: usize, n: usize) -> f32 {
        let phase = TAU * i as f32 / n as f32;
        match self {
            WindowKind::Square => 1.0,
            WindowKind::Hann => 0.5 - 0.5 * phase.cos(),
            WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
            WindowKind::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
        }
    }

    /// Coefficients for an `n`-sample frame.
    pub fn coefficients(self, n: usize, normalize: bool) -> Vec<f32> {
        let mut w: Vec<f32> = (0..n).map(|i| self.coefficient(i, n)).collect();
        if normalize && n > 0 {
            // Scale to unit mean-square so a windowed frame keeps its RMS.
            let ms = w.iter().map(|c| c * c).sum::<f32>() / n as f32;
            if ms > 0.0 {
                let g = ms.sqrt().recip();
                w.iter_mut().for_each(|c| *c *= g);
            }
        }
        w
    }
}

/// Multiplies each frame by a window.
///
/// Ports: `frame` in, `frame` out.
pub struct Windowing {
    kind: WindowKind,
    normalize: bool,
    window: Vec<f32>,
}

impl Windowing {
    /// A normalized window of the given shape.
    pub fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            normalize: true,
            window: Vec::new(),
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self.window.clear();
        self
    }

    #[inline]
    pub fn window_kind(&self) -> WindowKind {
        self.kind
    }
}

impl Algorithm for Windowing {
    fn kind(&self) -> &'static str {
        "Windowing"
    }

    fn inputs(&self) -> &[&'static str] {
        &["frame"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["frame"]
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let mut frame = inputs.pop_nonempty(0)?;
        if self.window.len() != frame.len() {
            self.window = self.kind.coefficients(frame.len(), self.normalize);
        }

        for (s, w) in frame.iter_mut().zip(&self.window) {
            *s *= w;
        }
        outputs.push(0, frame);
        Ok(())
    }
}
