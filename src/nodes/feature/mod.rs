//! Descriptor nodes

mod centroid;
mod level;
mod mfcc;
mod spectrum;

pub use centroid::Centroid;
pub use level::{Energy, InstantPower, Rms};
pub use mfcc::Mfcc;
pub use spectrum::Spectrum;
