//! The stock analysis network

use crate::error::GraphConfigError;
use crate::graph::{GraphBuilder, SOURCE};
use crate::nodes::{
    Centroid, DcRemoval, Energy, FrameCutter, InstantPower, Mfcc, Rms, Spectrum, WindowKind,
    Windowing,
};

/// Pool keys written by [`standard`].
pub mod keys {
    pub const RMS: &str = "RMS";
    pub const ENERGY: &str = "Energy";
    pub const POWER: &str = "Power";
    /// Magnitude spectrum, `frame_size / 2 + 1` bins
    pub const SPECTRUM: &str = "Spectrum";
    /// Spectral centroid in Hz
    pub const CENTROID: &str = "Centroid";
    pub const MFCC_BANDS: &str = "MFCC.Bands";
    pub const MFCC_COEFS: &str = "MFCC.Coefs";

    /// Every key, in wiring order.
    pub const ALL: [&str; 7] = [RMS, ENERGY, POWER, SPECTRUM, CENTROID, MFCC_BANDS, MFCC_COEFS];
}

/// Wire the stock network into `b`:
///
/// ```text
/// signal -> dcremoval -> framecutter -> windowing -+-> rms
///                                                  +-> energy
///                                                  +-> power
///                                                  +-> spectrum -+-> centroid
///                                                                +-> mfcc
/// ```
///
/// Frame and hop sizes and the sample rate come from the builder's context.
/// The window is a normalized Hamming.
pub fn standard(b: &mut GraphBuilder) -> Result<(), GraphConfigError> {
    let ctx = *b.context();
    let nyquist = ctx.sample_rate as f32 / 2.0;

    b.add("dcremoval", DcRemoval::new())?;
    b.add("framecutter", FrameCutter::new(ctx.frame_size, ctx.hop_size))?;
    b.add("windowing", Windowing::new(WindowKind::Hamming))?;
    b.add("rms", Rms::new())?;
    b.add("energy", Energy::new())?;
    b.add("power", InstantPower::new())?;
    b.add("spectrum", Spectrum::new(ctx.frame_size))?;
    b.add("centroid", Centroid::new(nyquist))?;
    b.add("mfcc", Mfcc::new(ctx.sample_rate))?;

    b.connect((SOURCE, SOURCE), ("dcremoval", "signal"))?;
    b.connect(("dcremoval", "signal"), ("framecutter", "signal"))?;
    b.connect(("framecutter", "frame"), ("windowing", "frame"))?;
    b.connect(("windowing", "frame"), ("rms", "array"))?;
    b.connect(("windowing", "frame"), ("energy", "array"))?;
    b.connect(("windowing", "frame"), ("power", "array"))?;
    b.connect(("windowing", "frame"), ("spectrum", "frame"))?;
    b.connect(("spectrum", "spectrum"), ("centroid", "array"))?;
    b.connect(("spectrum", "spectrum"), ("mfcc", "spectrum"))?;

    b.store(("rms", "rms"), keys::RMS)?;
    b.store(("energy", "energy"), keys::ENERGY)?;
    b.store(("power", "power"), keys::POWER)?;
    b.store(("spectrum", "spectrum"), keys::SPECTRUM)?;
    b.store(("centroid", "centroid"), keys::CENTROID)?;
    b.store(("mfcc", "bands"), keys::MFCC_BANDS)?;
    b.store(("mfcc", "mfcc"), keys::MFCC_COEFS)?;

    Ok(())
}
