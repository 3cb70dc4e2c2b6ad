//! Spectral centroid

use crate::error::InputViolation;
use crate::node::{Algorithm, Inputs, Outputs, ProcessContext};

/// Centre of mass of an array, scaled so the last index maps to `range`.
///
/// Fed a magnitude spectrum with `range` set to the Nyquist frequency, this
/// gives the spectral centroid in Hz. An all-zero array yields zero.
///
/// Ports: `array` in, `centroid` out.
pub struct Centroid {
    range: f32,
}

impl Centroid {
    pub fn new(range: f32) -> Self {
        Self { range }
    }

    #[inline]
    pub fn range(&self) -> f32 {
        self.range
    }
}

impl Algorithm for Centroid {
    fn kind(&self) -> &'static str {
        "Centroid"
    }

    fn inputs(&self) -> &[&'static str] {
        &["array"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["centroid"]
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let array = inputs.pop_nonempty(0)?;

        let (weighted, total) = array
            .iter()
            .enumerate()
            .fold((0.0f64, 0.0f64), |(w, t), (i, &x)| (w + i as f64 * x as f64, t + x as f64));

        let centroid = if total == 0.0 || array.len() < 2 {
            0.0
        } else {
            (weighted / total) * self.range as f64 / (array.len() - 1) as f64
        };
        outputs.push(0, centroid as f32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::VecDeque;

    fn centroid(range: f32, array: Vec<f32>) -> f32 {
        let ctx = ProcessContext {
            sample_rate: 8000,
            frame_size: 8,
            hop_size: 8,
        };
        let mut queues = vec![VecDeque::from([Value::Vector(array)])];
        let mut pending = Vec::new();
        Centroid::new(range)
            .process(&ctx, &mut Inputs::new(&mut queues), &mut Outputs::new(&mut pending, 1))
            .unwrap();
        pending[0].1.as_real().unwrap()
    }

    #[test]
    fn single_peak_maps_to_its_frequency() {
        // 5 bins spanning 0..4000 Hz, all energy at bin 2
        assert_eq!(centroid(4000.0, vec![0.0, 0.0, 1.0, 0.0, 0.0]), 2000.0);
    }

    #[test]
    fn silence_is_zero() {
        assert_eq!(centroid(4000.0, vec![0.0; 5]), 0.0);
    }
}
