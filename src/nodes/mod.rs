//! Built-in analysis nodes.
//!
//! Nodes are organized into two categories:
//!
//! ## Signal ([`signal`])
//!
//! Condition and slice the raw sample stream:
//! - [`DcRemoval`] - One-pole high-pass that strips DC offset
//! - [`FrameCutter`] - Slice a sample stream into overlapping frames
//! - [`Windowing`] - Apply a Hann, Hamming, Blackman or square window
//!
//! ## Features ([`feature`])
//!
//! Reduce a frame to descriptors:
//! - [`Rms`], [`Energy`], [`InstantPower`] - Level of a frame
//! - [`Spectrum`] - Magnitude spectrum via a real FFT
//! - [`Centroid`] - Spectral centroid in Hz
//! - [`Mfcc`] - Mel band energies and cepstral coefficients
//!
//! # Ports
//!
//! Port names are what [`GraphBuilder::connect`](crate::graph::GraphBuilder::connect)
//! takes. Each node documents its own.

pub mod feature;
pub mod signal;

pub use feature::{Centroid, Energy, InstantPower, Mfcc, Rms, Spectrum};
pub use signal::{DcRemoval, FrameCutter, WindowKind, Windowing};
