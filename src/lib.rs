//! mltk - streaming audio feature extraction
//!
//! Design principles:
//! - One analysis graph per input channel, plus one for the mono mixdown
//! - Topology is wired by name at setup and frozen before the first tick
//! - Nodes publish results into a per-channel pool under named keys
//! - Ticks are synchronous and caller-driven; no threads, no locks
//! - Capture devices hand samples over through a lock-free ring
//!
//! ```
//! use mltk::{Channel, Mltk, MltkConfig};
//!
//! let config = MltkConfig::default().with_channels(1).with_record(true);
//! let mut mltk = Mltk::standard(config)?;
//!
//! let block: Vec<f32> = (0..mltk.frame_size())
//!     .map(|i| (i as f32 * 0.1).sin() * 0.5)
//!     .collect();
//! mltk.ingest(0, &block)?;
//! mltk.tick()?;
//!
//! println!("rms: {}", mltk.get_value("RMS", Channel::Mono)?);
//! mltk.flush_aggregate(std::io::stdout())?;
//! # Ok::<(), mltk::Error>(())
//! ```

pub mod aggregate;
pub mod capture;
mod context;
#[cfg(feature = "cpal_input")]
mod device;
mod error;
pub mod graph;
mod mltk;
pub mod network;
mod node;
pub mod nodes;
mod pool;
mod value;

pub use aggregate::{AggregateSnapshot, Statistics};
pub use capture::{FeedConsumer, FeedProducer};
pub use context::{Channel, ChannelContext};
#[cfg(feature = "cpal_input")]
pub use device::CpalInput;
pub use error::{
    ChannelFailure, Error, GraphConfigError, InputViolation, NodeInputError, PortDirection,
    Result, RunError, TickError,
};
pub use graph::{Connection, Graph, GraphBuilder, SOURCE};
pub use mltk::{Mltk, MltkConfig};
pub use node::{Algorithm, Inputs, NodeId, Outputs, ProcessContext};
pub use pool::Pool;
pub use value::{Value, ValueKind};
