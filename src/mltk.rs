//! High-level analysis engine API

use std::fs::File;
use std::io::{BufWriter, Write};
use std::iter;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::aggregate::AggregateSnapshot;
use crate::capture::FeedConsumer;
use crate::context::{Channel, ChannelContext};
use crate::error::{ChannelFailure, Error, GraphConfigError, Result, TickError};
use crate::graph::GraphBuilder;
use crate::network;
use crate::node::ProcessContext;
use crate::value::{Value, ValueKind};

/// Engine configuration, fixed for the lifetime of an [`Mltk`].
///
/// ```
/// use mltk::MltkConfig;
///
/// let config = MltkConfig::default()
///     .with_frame_size(1024)
///     .with_hop_size(512)
///     .with_record(true);
/// assert_eq!(config.channels, 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MltkConfig {
    /// Samples per ingested block, per channel
    pub frame_size: usize,
    /// Distance between analysis frames, used by frame cutters
    pub hop_size: usize,
    pub sample_rate: u32,
    /// Input channel count, not counting the mono mixdown
    pub channels: usize,
    /// Keep pool contents across ticks instead of clearing them
    pub accumulate: bool,
    /// Recompute every context's aggregate at the end of each tick
    pub record: bool,
}

impl Default for MltkConfig {
    fn default() -> Self {
        Self {
            frame_size: 512,
            hop_size: 256,
            sample_rate: 44100,
            channels: 2,
            accumulate: false,
            record: false,
        }
    }
}

impl MltkConfig {
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_hop_size(mut self, hop_size: usize) -> Self {
        self.hop_size = hop_size;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_accumulate(mut self, accumulate: bool) -> Self {
        self.accumulate = accumulate;
        self
    }

    pub fn with_record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Reject zero sizes, rates and channel counts.
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("frame_size", self.frame_size == 0),
            ("hop_size", self.hop_size == 0),
            ("sample_rate", self.sample_rate == 0),
            ("channels", self.channels == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(Error::InvalidConfig(format!("{} must be non-zero", field))),
            None => Ok(()),
        }
    }

    /// The context handed to every node.
    pub fn process_context(&self) -> ProcessContext {
        ProcessContext {
            sample_rate: self.sample_rate,
            frame_size: self.frame_size,
            hop_size: self.hop_size,
        }
    }
}

/// The analysis engine: one graph per input channel plus one for the mono
/// mixdown, each with its own pool.
///
/// # Creating an Instance
///
/// [`Mltk::standard`] wires the stock network from [`network::standard`]:
///
/// ```
/// use mltk::{Mltk, MltkConfig};
///
/// let mut mltk = Mltk::standard(MltkConfig::default())?;
/// # Ok::<(), mltk::Error>(())
/// ```
///
/// For a custom topology, pass a closure to [`Mltk::new`]. It runs once per
/// context, mono first, and gets to see which context it is wiring:
///
/// ```
/// use mltk::graph::SOURCE;
/// use mltk::nodes::{Rms, WindowKind, Windowing};
/// use mltk::{Mltk, MltkConfig};
///
/// let mut mltk = Mltk::new(MltkConfig::default(), |_channel, b| {
///     b.add("window", Windowing::new(WindowKind::Hann))?;
///     b.add("rms", Rms::new())?;
///     b.connect((SOURCE, SOURCE), ("window", "frame"))?;
///     b.connect(("window", "frame"), ("rms", "array"))?;
///     b.store(("rms", "rms"), "RMS")
/// })?;
/// # Ok::<(), mltk::Error>(())
/// ```
///
/// # Processing
///
/// Load one block per channel with [`ingest`](Self::ingest) (or all at once
/// with [`ingest_interleaved`](Self::ingest_interleaved)), then call
/// [`tick`](Self::tick) and read results back:
///
/// ```
/// # use mltk::{Channel, Mltk, MltkConfig};
/// # let mut mltk = Mltk::standard(MltkConfig::default())?;
/// let block = vec![0.25f32; mltk.frame_size()];
/// mltk.ingest(0, &block)?;
/// mltk.ingest(1, &block)?;
/// mltk.tick()?;
///
/// let rms = mltk.get_value("RMS", Channel::Mono)?;
/// let spectrum = mltk.get_vector("Spectrum", 0)?;
/// assert_eq!(spectrum.len(), mltk.frame_size() / 2 + 1);
/// # let _ = rms;
/// # Ok::<(), mltk::Error>(())
/// ```
pub struct Mltk {
    config: MltkConfig,
    mono: ChannelContext,
    channels: Vec<ChannelContext>,
    ticks: u64,
    /// Feed overrun count at the last drain
    seen_overruns: usize,
}

impl Mltk {
    /// Build an engine, calling `topology` once per context to wire its graph.
    pub fn new<F>(config: MltkConfig, mut topology: F) -> Result<Self>
    where
        F: FnMut(Channel, &mut GraphBuilder) -> std::result::Result<(), GraphConfigError>,
    {
        config.validate()?;
        let ctx = config.process_context();

        let mut build = |channel: Channel| -> Result<ChannelContext> {
            let mut b = GraphBuilder::new(ctx);
            topology(channel, &mut b)?;
            Ok(ChannelContext::new(channel, b.build()?))
        };

        let mono = build(Channel::Mono)?;
        let channels = (0..config.channels)
            .map(|i| build(Channel::Index(i)))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            channels = config.channels,
            frame_size = config.frame_size,
            hop_size = config.hop_size,
            sample_rate = config.sample_rate,
            nodes = mono.graph().len(),
            "engine built"
        );

        Ok(Self {
            config,
            mono,
            channels,
            ticks: 0,
            seen_overruns: 0,
        })
    }

    /// Build an engine running the stock network in every context.
    pub fn standard(config: MltkConfig) -> Result<Self> {
        Self::new(config, |_, b| network::standard(b))
    }

    /// Copy one block into an input channel's buffer.
    ///
    /// `block` must be exactly [`frame_size`](Self::frame_size) samples long.
    pub fn ingest(&mut self, channel: usize, block: &[f32]) -> Result<()> {
        let channels = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or(Error::ChannelIndexOutOfRange {
                channel: Channel::Index(channel),
                channels,
            })?
            .load(block)
    }

    /// Split an interleaved block of `frame_size * channels` samples across
    /// every input channel's buffer.
    pub fn ingest_interleaved(&mut self, block: &[f32]) -> Result<()> {
        let n = self.channels.len();
        let expected = self.config.frame_size * n;
        if block.len() != expected {
            return Err(Error::BlockLength {
                expected,
                got: block.len(),
            });
        }

        for (ch, ctx) in self.channels.iter_mut().enumerate() {
            for (dst, src) in ctx.buffer_mut().iter_mut().zip(block.iter().skip(ch).step_by(n)) {
                *dst = *src;
            }
        }
        Ok(())
    }

    /// Run one analysis cycle over the buffers as they stand:
    /// mixdown, clear (unless accumulating), execute every context, and
    /// aggregate (when recording).
    ///
    /// A context whose graph fails does not stop the others. Every failure is
    /// reported in the returned [`TickError`], after the aggregate phase ran.
    pub fn tick(&mut self) -> Result<()> {
        self.mixdown();

        if !self.config.accumulate {
            self.clear_pools();
        }

        let mut failures = Vec::new();
        for ctx in self.contexts_mut() {
            if let Err(error) = ctx.execute() {
                tracing::warn!(channel = %ctx.channel(), %error, "context failed during tick");
                failures.push(ChannelFailure {
                    channel: ctx.channel(),
                    error,
                });
            }
        }

        if self.config.record {
            self.aggregate_now();
        }

        self.ticks += 1;
        tracing::trace!(tick = self.ticks, failed = failures.len(), "tick complete");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TickError { failures }.into())
        }
    }

    /// Ingest and tick once per complete block waiting in `feed`.
    ///
    /// Returns the number of ticks run. Stops at the first failed tick.
    pub fn drain(&mut self, feed: &mut FeedConsumer) -> Result<usize> {
        if feed.channels() != self.channels.len() || feed.frame_size() != self.config.frame_size {
            return Err(Error::InvalidConfig(format!(
                "feed carries {} channels x {} samples, engine expects {} x {}",
                feed.channels(),
                feed.frame_size(),
                self.channels.len(),
                self.config.frame_size
            )));
        }

        let overruns = feed.overruns();
        if overruns > self.seen_overruns {
            tracing::warn!(
                dropped = overruns - self.seen_overruns,
                total = overruns,
                "capture feed overrun"
            );
            self.seen_overruns = overruns;
        }

        let mut ticks = 0;
        while let Some(block) = feed.next_block() {
            self.ingest_interleaved(block)?;
            self.tick()?;
            ticks += 1;
        }
        Ok(ticks)
    }

    /// Empty every context's pool. Keys stay known.
    pub fn clear_pools(&mut self) {
        for ctx in self.contexts_mut() {
            ctx.clear_pool();
        }
    }

    /// Recompute every context's aggregate now, recording or not.
    pub fn aggregate_now(&mut self) {
        for ctx in self.contexts_mut() {
            let keys = ctx.refresh_aggregate().len();
            tracing::trace!(channel = %ctx.channel(), keys, "aggregate refreshed");
        }
    }

    /// The last aggregate computed for `channel`, if any.
    pub fn aggregate(&self, channel: impl Into<Channel>) -> Result<Option<&AggregateSnapshot>> {
        Ok(self.context(channel)?.aggregate())
    }

    /// Latest scalar written under `name`.
    pub fn get_value(&self, name: &str, channel: impl Into<Channel>) -> Result<f32> {
        let latest = self.context(channel)?.pool().read_latest(name)?;
        latest.as_real().ok_or_else(|| Error::ValueKind {
            key: name.to_owned(),
            expected: ValueKind::Real,
            found: latest.kind(),
        })
    }

    /// Latest vector written under `name`.
    pub fn get_vector(&self, name: &str, channel: impl Into<Channel>) -> Result<&[f32]> {
        let latest = self.context(channel)?.pool().read_latest(name)?;
        latest.as_vector().ok_or_else(|| Error::ValueKind {
            key: name.to_owned(),
            expected: ValueKind::Vector,
            found: latest.kind(),
        })
    }

    /// Everything written under `name` since the last clear.
    pub fn get_series(&self, name: &str, channel: impl Into<Channel>) -> Result<&[Value]> {
        self.context(channel)?.pool().read_all(name)
    }

    /// Whether any node ever wrote `name` in this context.
    pub fn exists(&self, name: &str, channel: impl Into<Channel>) -> Result<bool> {
        Ok(self.context(channel)?.pool().contains(name))
    }

    /// Write every stored aggregate as pretty JSON, keyed `mono`, `channel0`, ...
    ///
    /// Contexts that were never aggregated are left out. Output depends only
    /// on the stored snapshots, so repeated flushes are identical.
    pub fn flush_aggregate<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, &FlushView(self))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn flush_aggregate_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "flushing aggregate");
        self.flush_aggregate(BufWriter::new(File::create(path)?))
    }

    pub fn context(&self, channel: impl Into<Channel>) -> Result<&ChannelContext> {
        match channel.into() {
            Channel::Mono => Ok(&self.mono),
            Channel::Index(i) => self.channels.get(i).ok_or(Error::ChannelIndexOutOfRange {
                channel: Channel::Index(i),
                channels: self.channels.len(),
            }),
        }
    }

    /// Every context, mono first.
    pub fn contexts(&self) -> impl Iterator<Item = &ChannelContext> {
        iter::once(&self.mono).chain(self.channels.iter())
    }

    fn contexts_mut(&mut self) -> impl Iterator<Item = &mut ChannelContext> {
        iter::once(&mut self.mono).chain(self.channels.iter_mut())
    }

    /// Mono buffer becomes the sample-wise mean of the input channels.
    fn mixdown(&mut self) {
        let scale = (self.channels.len() as f32).recip();
        let mono = self.mono.buffer_mut();
        mono.fill(0.0);
        for ctx in &self.channels {
            for (m, s) in mono.iter_mut().zip(ctx.buffer()) {
                *m += s;
            }
        }
        mono.iter_mut().for_each(|m| *m *= scale);
    }

    #[inline]
    pub fn config(&self) -> &MltkConfig {
        &self.config
    }

    /// Number of input channels, not counting mono.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Ticks run so far, failed ones included.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Serializes the stored snapshots in context order.
struct FlushView<'a>(&'a Mltk);

impl Serialize for FlushView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for ctx in self.0.contexts() {
            if let Some(snapshot) = ctx.aggregate() {
                map.serialize_entry(&ctx.channel().to_string(), snapshot)?;
            }
        }
        map.end()
    }
}
