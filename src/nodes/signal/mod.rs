//! Signal conditioning nodes

mod dc_removal;
mod frame_cutter;
mod windowing;

pub use dc_removal::DcRemoval;
pub use frame_cutter::FrameCutter;
pub use windowing::{WindowKind, Windowing};
