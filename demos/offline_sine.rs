//! Analyse a synthetic stereo sweep offline and dump the aggregate
//!
//! Run with: cargo run --example offline_sine

use core::f32::consts::TAU;

use mltk::network::keys;
use mltk::{Channel, Mltk, MltkConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = MltkConfig::default().with_accumulate(true).with_record(true);
    let mut mltk = Mltk::standard(config)?;

    let rate = mltk.sample_rate() as f32;
    let frame = mltk.frame_size();
    let mut phase = [0.0f32; 2];
    let mut left = vec![0.0; frame];
    let mut right = vec![0.0; frame];

    // ~2 seconds; left sweeps upward, right stays at 440 Hz
    for tick in 0..172 {
        let sweep = 220.0 + tick as f32 * 10.0;
        for (buffer, (freq, phase)) in [&mut left, &mut right]
            .into_iter()
            .zip([sweep, 440.0].into_iter().zip(phase.iter_mut()))
        {
            for s in buffer.iter_mut() {
                *s = (*phase * TAU).sin() * 0.5;
                *phase = (*phase + freq / rate).fract();
            }
        }

        mltk.ingest(0, &left)?;
        mltk.ingest(1, &right)?;
        mltk.tick()?;

        if tick % 43 == 0 {
            println!(
                "tick {:3}: centroid L {:7.1} Hz  R {:7.1} Hz  mono rms {:.3}",
                tick,
                mltk.get_value(keys::CENTROID, 0)?,
                mltk.get_value(keys::CENTROID, 1)?,
                mltk.get_value(keys::RMS, Channel::Mono)?,
            );
        }
    }

    mltk.flush_aggregate(std::io::stdout().lock())?;
    Ok(())
}
