//! Overlapping frame slicer

use crate::error::InputViolation;
use crate::node::{Algorithm, Inputs, Outputs, ProcessContext};

/// Slices a sample stream into frames of `frame_size`, advancing by
/// `hop_size` between frames. The first frame starts at sample zero.
///
/// Samples not yet covered by a full frame carry over to the next tick, so
/// with a hop smaller than the block length one tick can yield several frames.
/// Each invocation emits at most one frame.
///
/// Ports: `signal` in, `frame` out.
pub struct FrameCutter {
    frame_size: usize,
    hop_size: usize,
    pending: Vec<f32>,
    /// Start of the next frame within `pending`
    head: usize,
    /// Hop overshoot still to drop from incoming samples
    to_skip: usize,
}

impl FrameCutter {
    /// Zero sizes are raised to one.
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            hop_size: hop_size.max(1),
            pending: Vec::with_capacity(frame_size * 2),
            head: 0,
            to_skip: 0,
        }
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    #[inline]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Samples buffered toward the next frame.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.pending.len() - self.head
    }

    #[inline]
    fn has_frame(&self) -> bool {
        self.buffered() >= self.frame_size
    }

    fn absorb(&mut self, block: &[f32]) {
        // Consumed samples are dropped once per block, not once per frame.
        if self.head > 0 {
            self.pending.drain(..self.head);
            self.head = 0;
        }
        let skip = self.to_skip.min(block.len());
        self.to_skip -= skip;
        self.pending.extend_from_slice(&block[skip..]);
    }

    fn advance(&mut self) {
        self.head += self.hop_size;
        if self.head >= self.pending.len() {
            self.to_skip = self.head - self.pending.len();
            self.pending.clear();
            self.head = 0;
        }
    }
}

impl Algorithm for FrameCutter {
    fn kind(&self) -> &'static str {
        "FrameCutter"
    }

    fn inputs(&self) -> &[&'static str] {
        &["signal"]
    }

    fn outputs(&self) -> &[&'static str] {
        &["frame"]
    }

    fn is_ready(&self, inputs: &Inputs<'_>) -> bool {
        inputs.available(0) > 0 || self.has_frame()
    }

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        inputs: &mut Inputs<'_>,
        outputs: &mut Outputs<'_>,
    ) -> Result<(), InputViolation> {
        while inputs.available(0) > 0 {
            let block = inputs.pop_vector(0)?;
            self.absorb(&block);
        }

        if self.has_frame() {
            let end = self.head + self.frame_size;
            outputs.push(0, &self.pending[self.head..end]);
            self.advance();
        }
        Ok(())
    }
}
