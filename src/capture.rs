//! Lock-free sample feed between an audio callback and the analysis thread.
//!
//! The producer half lives in the device callback and never blocks or
//! allocates. The consumer half hands whole interleaved blocks to
//! [`Mltk::drain`](crate::Mltk::drain).
//!
//! ```
//! use mltk::capture;
//!
//! let (mut tx, mut rx) = capture::feed(2, 4, 8);
//! assert_eq!(tx.push_interleaved(&[0.5; 8]), 8);
//! assert_eq!(rx.next_block().map(<[f32]>::len), Some(8));
//! assert!(rx.next_block().is_none());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

/// Create a feed holding up to `blocks` interleaved blocks of
/// `frame_size * channels` samples. Zero arguments are raised to one.
pub fn feed(channels: usize, frame_size: usize, blocks: usize) -> (FeedProducer, FeedConsumer) {
    let channels = channels.max(1);
    let frame_size = frame_size.max(1);
    let block_len = channels * frame_size;
    let (producer, consumer) = RingBuffer::<f32>::new(block_len * blocks.max(1));
    let overruns = Arc::new(AtomicUsize::new(0));

    (
        FeedProducer {
            producer,
            channels,
            overruns: overruns.clone(),
        },
        FeedConsumer {
            consumer,
            channels,
            frame_size,
            block: vec![0.0; block_len],
            overruns,
        },
    )
}

/// Writing half, for the audio callback thread.
pub struct FeedProducer {
    producer: Producer<f32>,
    channels: usize,
    /// Samples dropped because the ring was full
    overruns: Arc<AtomicUsize>,
}

impl FeedProducer {
    /// Push interleaved samples, returning how many were accepted.
    ///
    /// Only whole sample frames (one sample per channel) are written so the
    /// channel interleaving never slips. Whatever does not fit is dropped and
    /// counted as an overrun.
    pub fn push_interleaved(&mut self, data: &[f32]) -> usize {
        let room = self.producer.slots() / self.channels * self.channels;
        let whole = data.len() / self.channels * self.channels;
        let n = whole.min(room);

        let written = match self.producer.write_chunk_uninit(n) {
            Ok(chunk) => chunk.fill_from_iter(data[..n].iter().copied()),
            Err(_) => 0,
        };

        let dropped = data.len() - written;
        if dropped > 0 {
            self.overruns.fetch_add(dropped, Ordering::Relaxed);
        }
        written
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Free space in samples.
    #[inline]
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

/// Reading half, for the thread that ticks the engine.
pub struct FeedConsumer {
    consumer: Consumer<f32>,
    channels: usize,
    frame_size: usize,
    block: Vec<f32>,
    overruns: Arc<AtomicUsize>,
}

impl FeedConsumer {
    /// Take the next complete interleaved block, if one is waiting.
    pub fn next_block(&mut self) -> Option<&[f32]> {
        let chunk = self.consumer.read_chunk(self.block.len()).ok()?;
        let (head, tail) = chunk.as_slices();
        self.block[..head.len()].copy_from_slice(head);
        self.block[head.len()..].copy_from_slice(tail);
        chunk.commit_all();
        Some(&self.block)
    }

    /// Complete blocks waiting to be read.
    #[inline]
    pub fn available_blocks(&self) -> usize {
        self.consumer.slots() / self.block.len()
    }

    /// Total samples dropped by the producer so far.
    #[inline]
    pub fn overruns(&self) -> usize {
        self.overruns.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}
