//! Print live RMS and spectral centroid from the default input device
//!
//! Run with: cargo run --example live_input --features cpal_input

use std::thread::sleep;
use std::time::{Duration, Instant};

use mltk::network::keys;
use mltk::{capture, Channel, CpalInput, Mltk};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    for device in CpalInput::list_inputs() {
        println!("found {} ({} Hz, {} ch)", device.name(), device.sample_rate(), device.channels());
    }

    let mut input = CpalInput::default_input().ok_or("No input device")?;
    let config = input.mltk_config().with_frame_size(1024).with_hop_size(512);
    let (tx, mut rx) = capture::feed(config.channels, config.frame_size, 32);
    input.start(tx)?;

    let mut mltk = Mltk::standard(config)?;
    println!("Listening on {}... Ctrl+C to stop", input.name());

    let mut last_print = Instant::now();
    loop {
        mltk.drain(&mut rx)?;

        if last_print.elapsed() >= Duration::from_millis(100) && mltk.ticks() > 0 {
            let rms = mltk.get_value(keys::RMS, Channel::Mono)?;
            let centroid = mltk.get_value(keys::CENTROID, Channel::Mono)?;
            let bar = "#".repeat((rms * 200.0).min(60.0) as usize);
            println!("{:8.1} Hz  {:.4}  {}", centroid, rms, bar);
            last_print = Instant::now();
        }
        sleep(Duration::from_millis(2));
    }
}
