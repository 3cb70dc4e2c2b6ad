//! CPAL input device discovery and capture.
//!
//! [`CpalInput`] finds an input device and streams its samples into a
//! [`FeedProducer`]. The engine side reads them with
//! [`Mltk::drain`](crate::Mltk::drain).
//!
//! # Example: Analyse the Default Input
//!
//! ```no_run
//! use mltk::{capture, CpalInput, Mltk};
//!
//! let mut input = CpalInput::default_input().expect("no input device");
//! let config = input.mltk_config();
//! let (tx, mut rx) = capture::feed(config.channels, config.frame_size, 16);
//! input.start(tx)?;
//!
//! let mut mltk = Mltk::standard(config)?;
//! loop {
//!     mltk.drain(&mut rx)?;
//!     std::thread::sleep(std::time::Duration::from_millis(5));
//! }
//! # Ok::<(), mltk::Error>(())
//! ```

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig};

use crate::capture::FeedProducer;
use crate::error::{Error, Result};
use crate::mltk::MltkConfig;

/// Preallocated conversion space for integer sample formats
const SCRATCH_SAMPLES: usize = 1 << 14;

/// A discovered audio input device.
///
/// Use [`CpalInput::default_input`] for the system default,
/// [`CpalInput::by_name`] to pick one, or [`CpalInput::list_inputs`] to
/// enumerate. Capture runs from [`start`](Self::start) until
/// [`stop`](Self::stop) or drop.
pub struct CpalInput {
    device: cpal::Device,
    config: SupportedStreamConfig,
    name: String,
    sample_rate: u32,
    channels: u16,
    stream: Option<cpal::Stream>,
}

impl CpalInput {
    fn from_device(device: cpal::Device) -> Option<Self> {
        let config = device.default_input_config().ok()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        Some(Self {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
            name,
            device,
            config,
            stream: None,
        })
    }

    /// The system's default input device, or `None` if there is none.
    pub fn default_input() -> Option<Self> {
        let host = cpal::default_host();
        Self::from_device(host.default_input_device()?)
    }

    /// Every input device with a usable default configuration.
    ///
    /// ```no_run
    /// # use mltk::CpalInput;
    /// for device in CpalInput::list_inputs() {
    ///     println!("{}: {} Hz, {} ch", device.name(), device.sample_rate(), device.channels());
    /// }
    /// ```
    pub fn list_inputs() -> Vec<Self> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(Self::from_device).collect())
            .unwrap_or_default()
    }

    /// The first input device whose name contains `name`.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::list_inputs().into_iter().find(|d| d.name.contains(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Default engine configuration with this device's rate and channel count.
    pub fn mltk_config(&self) -> MltkConfig {
        MltkConfig::default()
            .with_sample_rate(self.sample_rate)
            .with_channels(self.channels as usize)
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }

    /// Open the stream and start pushing samples into `feed`.
    ///
    /// A running stream is replaced.
    pub fn start(&mut self, feed: FeedProducer) -> Result<()> {
        if feed.channels() != self.channels as usize {
            return Err(Error::Device(format!(
                "feed carries {} channels, `{}` delivers {}",
                feed.channels(),
                self.name,
                self.channels
            )));
        }

        let stream = build_stream(
            &self.device,
            self.config.sample_format(),
            &self.config.config(),
            feed,
        )?;
        stream.play().map_err(|e| Error::Device(e.to_string()))?;

        tracing::debug!(
            device = %self.name,
            sample_rate = self.sample_rate,
            channels = self.channels,
            format = ?self.config.sample_format(),
            "input stream started"
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Close the stream. The feed's producer half is dropped with it.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!(device = %self.name, "input stream stopped");
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    stream_config: &cpal::StreamConfig,
    mut feed: FeedProducer,
) -> Result<cpal::Stream> {
    let on_error = |err: cpal::StreamError| tracing::error!(%err, "input stream error");
    let mut scratch: Vec<f32> = Vec::with_capacity(SCRATCH_SAMPLES);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                feed.push_interleaved(data);
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| s as f32 / 32768.0));
                feed.push_interleaved(&scratch);
            },
            on_error,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0));
                feed.push_interleaved(&scratch);
            },
            on_error,
            None,
        ),
        other => {
            return Err(Error::Device(format!("unsupported sample format: {:?}", other)));
        }
    };

    stream.map_err(|e| Error::Device(e.to_string()))
}
