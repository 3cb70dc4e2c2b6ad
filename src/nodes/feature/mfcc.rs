//! Mel-frequency cepstral coefficients

use core::f32::consts::PI;

use crate::error::InputViolation;
use crate::node::{Algorithm, Inputs, Outputs, ProcessContext};

const DEFAULT_BANDS: usize = 40;
const DEFAULT_COEFFICIENTS: usize = 13;
const DEFAULT_HIGH: f32 = 11000.0;
const LOG_FLOOR: f32 = 1e-10;

#[inline]
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

#[inline]
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Mel band energies and their cepstrum.
///
/// Takes a magnitude spectrum, sums its power through a bank of triangular
/// filters spaced evenly on the HTK mel scale, compresses to dB and applies
/// an orthonormal DCT-II. The filterbank is built for the first spectrum
/// length seen and rebuilt if it changes.
///
/// Ports: `spectrum` in, `bands` and `mfcc` out.
pub struct Mfcc {
    bands: usize,
    coefficients: usize,
    sample_rate: u32,
    low: f32,
    high: f32,
    /// Dense filter weights per band, each as long as the input spectrum
    filters: Vec<Vec<f32>>,
    /// Row-major coefficients x bands
    dct: Vec<f32>,
    log_bands: Vec<f32>,
}

impl Mfcc {
    /// 40 bands from 0 Hz to 11 kHz (clamped to Nyquist), 13 coefficients.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            bands: DEFAULT_BANDS,
            coefficients: DEFAULT_COEFFICIENTS,
            sample_rate,
            low: 0.0,
            high: DEFAULT_HIGH,
            filters: Vec::new(),
            dct: Vec::new(),
            log_bands: Vec::new(),
        }
    }

    /// Zero is raised to one.
    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands.max(1);
        self.filters.clear();
        self
    }

    /// Zero is raised to one.
    pub fn with_coefficients(mut self, coefficients: usize) -> Self {
        self.coefficients = coefficients.max(1);
        self.filters.clear();
        self
    }

    pub fn with_range(mut self, low: f32, high: f32) -> Self {
        self.low = low.max(0.0);
        self.high = high.max(self.low);
        self.filters.clear();
        self
    }

    #[inline]
    pub fn bands(&self) -> usize {
        self.bands
    }

    #[inline]
    pub fn coefficients(&self) -> usize {
        self.coefficients
    }

    fn prepare(&mut self, bins: usize) {
        if self.filters.len() == self.bands && self.filters.first().map(Vec::len) == Some(bins) {
            return;
        }

        let nyquist = self.sample_rate as f32 / 2.0;
        let high = self.high.min(nyquist);
        let low = self.low.min(high);
        let (mel_lo, mel_hi) = (hz_to_mel(low), hz_to_mel(high));
        let step = (mel_hi - mel_lo) / (self.bands + 1) as f32;
        let edges: Vec<f32> = (0..self.bands + 2)
            .map(|i| mel_to_hz(mel_lo + step * i as f32))
            .collect();

        let bin_hz = if bins > 1 { nyquist / (bins - 1) as f32 } else { 0.0 };
        self.filters = edges
            .windows(3)
            .map(|e| {
                let (lo, mid, hi) = (e[0], e[1], e[2]);
                (0..bins)
                    .map(|k| {
                        let f = k as f32 * bin_hz;
                        if f > lo && f <= mid && mid > lo {
                            (f - lo) / (mid - lo)
                        } else if f > mid && f < hi {
                            (hi - f) / (hi - mid)
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();

        let m = self.bands as f32;
        self.dct = (0..self.coefficients)
            .flat_map(|j| {
                let scale = if j == 0 { (1.0 / m).sqrt() } else { (2.0 / m).sqrt() };
                (0..self.bands).map(move |b| scale * (PI * j as f32 * (b as f32 + 0.5) / m).cos())
            })
            .collect();

        tracing::debug!(bins, bands = self.bands, low, high, "mel filterbank built");
    }
}

impl Algorithm for Mfcc {
    fn kind(&self) -> &'static str {
        "Mfcc"
    }

    fn inputs(&self) -> &[&'static str] {
        &["spectrum"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["bands", "mfcc"]
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        let spectrum = inputs.pop_nonempty(0)?;
        self.prepare(spectrum.len());

        let energies: Vec<f32> = self
            .filters
            .iter()
            .map(|filter| filter.iter().zip(&spectrum).map(|(w, x)| w * x * x).sum())
            .collect();

        self.log_bands.clear();
        self.log_bands
            .extend(energies.iter().map(|e| 10.0 * e.max(LOG_FLOOR).log10()));

        let coefs: Vec<f32> = self
            .dct
            .chunks_exact(self.bands)
            .map(|row| row.iter().zip(&self.log_bands).map(|(c, l)| c * l).sum())
            .collect();

        outputs.push(0, energies);
        outputs.push(1, coefs);
        Ok(())
    }
}
