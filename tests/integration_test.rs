use core::f32::consts::{SQRT_2, TAU};

use mltk::network::{self, keys};
use mltk::nodes::{Rms, Spectrum, WindowKind, Windowing};
use mltk::{
    capture, Channel, Error, GraphBuilder, GraphConfigError, Mltk, MltkConfig, RunError, SOURCE,
};
use proptest::prelude::*;

/// `periods` full cycles of a sine across `len` samples.
fn sine(periods: f32, amplitude: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (TAU * periods * i as f32 / len as f32).sin() * amplitude)
        .collect()
}

/// signal -> Hann window -> RMS, stored under "RMS"
fn window_rms(_channel: Channel, b: &mut GraphBuilder) -> Result<(), GraphConfigError> {
    b.add("window", Windowing::new(WindowKind::Hann))?;
    b.add("rms", Rms::new())?;
    b.connect((SOURCE, SOURCE), ("window", "frame"))?;
    b.connect(("window", "frame"), ("rms", "array"))?;
    b.store(("rms", "rms"), "RMS")
}

fn feed_all(mltk: &mut Mltk, block: &[f32]) {
    for ch in 0..mltk.channels() {
        mltk.ingest(ch, block).unwrap();
    }
}

#[test]
/// Every declared input in the stock network has exactly one producer
fn every_input_has_one_inbound_edge() {
    let mltk = Mltk::standard(MltkConfig::default()).unwrap();

    for ctx in mltk.contexts() {
        let graph = ctx.graph();
        let inputs: Vec<_> = graph.declared_inputs().collect();
        assert_eq!(inputs.len(), 9);
        for (node, port) in inputs {
            assert_eq!(graph.inbound_edges(node, port), 1, "{}.{}", node, port);
        }
    }
}

#[test]
/// Every context is wired identically and ordered identically
fn contexts_share_topology_and_order() {
    let mltk = Mltk::standard(MltkConfig::default().with_channels(3)).unwrap();
    let mono: Vec<_> = mltk.context(Channel::Mono).unwrap().graph().order().collect();

    assert_eq!(mono.first(), Some(&SOURCE));
    for ch in 0..3 {
        let order: Vec<_> = mltk.context(ch).unwrap().graph().order().collect();
        assert_eq!(order, mono);
    }
}

#[test]
/// A 512-sample sine through a normalized Hann window keeps its RMS
fn windowed_sine_rms() {
    let amplitude = 0.8;
    let config = MltkConfig::default().with_frame_size(512).with_hop_size(512);
    let mut mltk = Mltk::new(config, window_rms).unwrap();
    let block = sine(8.0, amplitude, 512);

    let mut previous = None;
    for _ in 0..5 {
        feed_all(&mut mltk, &block);
        mltk.tick().unwrap();

        for channel in [Channel::Mono, Channel::Index(0), Channel::Index(1)] {
            let rms = mltk.get_value("RMS", channel).unwrap();
            assert!((rms - amplitude / SQRT_2).abs() < 1e-3, "{}: {}", channel, rms);
        }

        let rms = mltk.get_value("RMS", 0).unwrap();
        if let Some(prev) = previous {
            assert_eq!(rms, prev);
        }
        previous = Some(rms);
    }
}

#[test]
/// One input channel: the mono context mirrors it exactly
fn single_channel_sine_rms() {
    let amplitude = 0.5;
    let config = MltkConfig::default()
        .with_channels(1)
        .with_frame_size(512)
        .with_hop_size(512);
    let mut mltk = Mltk::new(config, window_rms).unwrap();

    mltk.ingest(0, &sine(8.0, amplitude, 512)).unwrap();
    mltk.tick().unwrap();

    let rms = mltk.get_value("RMS", 0).unwrap();
    assert!((rms - amplitude / SQRT_2).abs() < 1e-3, "{}", rms);
    assert_eq!(mltk.get_value("RMS", Channel::Mono).unwrap(), rms);
    assert!(matches!(
        mltk.get_value("RMS", 1),
        Err(Error::ChannelIndexOutOfRange { .. })
    ));
}

#[test]
/// Without accumulation each tick only sees its own results
fn pools_clear_between_ticks() {
    let config = MltkConfig::default().with_frame_size(256).with_hop_size(256);
    let mut mltk = Mltk::new(config, window_rms).unwrap();

    for _ in 0..3 {
        feed_all(&mut mltk, &sine(4.0, 0.5, 256));
        mltk.tick().unwrap();
        assert_eq!(mltk.get_series("RMS", 0).unwrap().len(), 1);
        assert_eq!(mltk.get_series("RMS", Channel::Mono).unwrap().len(), 1);
    }
}

#[test]
/// Silence after signal: the latest value reflects the latest tick only
fn stale_values_do_not_survive_a_tick() {
    let config = MltkConfig::default().with_frame_size(256).with_hop_size(256);
    let mut mltk = Mltk::new(config, window_rms).unwrap();

    feed_all(&mut mltk, &sine(4.0, 0.5, 256));
    mltk.tick().unwrap();
    assert!(mltk.get_value("RMS", 0).unwrap() > 0.1);

    feed_all(&mut mltk, &[0.0; 256]);
    mltk.tick().unwrap();
    assert_eq!(mltk.get_value("RMS", 0).unwrap(), 0.0);
}

#[test]
/// A frame cutter with half-frame hop yields one frame, then two per tick
fn frame_cutter_carries_samples_across_ticks() {
    let mut mltk = Mltk::standard(MltkConfig::default().with_channels(1)).unwrap();
    let block = sine(8.0, 0.5, 512);

    mltk.ingest(0, &block).unwrap();
    mltk.tick().unwrap();
    assert_eq!(mltk.get_series(keys::RMS, 0).unwrap().len(), 1);

    mltk.ingest(0, &block).unwrap();
    mltk.tick().unwrap();
    assert_eq!(mltk.get_series(keys::RMS, 0).unwrap().len(), 2);
    assert_eq!(mltk.get_series(keys::MFCC_COEFS, 0).unwrap().len(), 2);
}

#[test]
/// Accumulating and recording a constant for 10 ticks
fn accumulate_and_record_constant() {
    let config = MltkConfig::default()
        .with_frame_size(128)
        .with_hop_size(128)
        .with_accumulate(true)
        .with_record(true);
    let mut mltk = Mltk::new(config, window_rms).unwrap();

    for _ in 0..10 {
        feed_all(&mut mltk, &[0.5; 128]);
        mltk.tick().unwrap();
    }

    assert_eq!(mltk.get_series("RMS", 0).unwrap().len(), 10);

    for channel in [Channel::Mono, Channel::Index(0), Channel::Index(1)] {
        let snapshot = mltk.aggregate(channel).unwrap().unwrap();
        let stats = snapshot.get("RMS").unwrap();
        let mean = stats.mean.as_real().unwrap();
        assert!((mean - 0.5).abs() < 1e-4, "{}: {}", channel, mean);
        assert!(stats.var.as_real().unwrap().abs() < 1e-9);
        assert_eq!(stats.min, stats.max);
    }

    mltk.clear_pools();
    assert!(mltk.get_series("RMS", 0).unwrap().is_empty());
    assert!(mltk.exists("RMS", 0).unwrap());
}

#[test]
/// No aggregate is taken unless recording or asked for
fn aggregate_only_when_requested() {
    let config = MltkConfig::default().with_frame_size(128).with_hop_size(128);
    let mut mltk = Mltk::new(config, window_rms).unwrap();
    feed_all(&mut mltk, &[0.25; 128]);
    mltk.tick().unwrap();
    assert!(mltk.aggregate(0).unwrap().is_none());

    mltk.aggregate_now();
    let snapshot = mltk.aggregate(0).unwrap().unwrap();
    assert_eq!(snapshot.keys().collect::<Vec<_>>(), ["RMS"]);
}

#[test]
/// Two flushes without an intervening tick are byte-identical
fn flush_is_idempotent() {
    let mut mltk = Mltk::standard(MltkConfig::default().with_record(true)).unwrap();
    feed_all(&mut mltk, &sine(3.0, 0.5, 512));
    mltk.tick().unwrap();

    let mut first = Vec::new();
    let mut second = Vec::new();
    mltk.flush_aggregate(&mut first).unwrap();
    mltk.flush_aggregate(&mut second).unwrap();
    assert_eq!(first, second);

    // Contexts are written mono first, then by channel index.
    let text = std::str::from_utf8(&first).unwrap();
    let positions: Vec<usize> = ["\"mono\"", "\"channel0\"", "\"channel1\""]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);

    let json: serde_json::Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 3);

    let rms = &json["channel0"][keys::RMS];
    for stat in ["mean", "var", "min", "max"] {
        assert!(rms[stat].is_number(), "{}", stat);
    }
    assert_eq!(json["mono"][keys::MFCC_COEFS]["mean"].as_array().unwrap().len(), 13);
}

#[test]
/// Flushing to a file writes the same bytes as flushing to memory
fn flush_to_path() {
    let mut mltk = Mltk::new(
        MltkConfig::default().with_frame_size(64).with_hop_size(64).with_record(true),
        window_rms,
    )
    .unwrap();
    feed_all(&mut mltk, &sine(2.0, 1.0, 64));
    mltk.tick().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aggregate.json");
    mltk.flush_aggregate_to_path(&path).unwrap();

    let mut expected = Vec::new();
    mltk.flush_aggregate(&mut expected).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), expected);
}

#[test]
/// A failing context is reported but does not stop the others
fn failing_context_is_isolated() {
    let config = MltkConfig::default()
        .with_frame_size(512)
        .with_hop_size(512)
        .with_record(true);

    let mut mltk = Mltk::new(config, |channel, b| {
        window_rms(channel, b)?;
        // Channel 1 expects the wrong frame length and rejects every frame.
        let size = if channel == Channel::Index(1) { 500 } else { 512 };
        b.add("spectrum", Spectrum::new(size))?;
        b.connect(("window", "frame"), ("spectrum", "frame"))?;
        b.store(("spectrum", "spectrum"), "Spectrum")
    })
    .unwrap();

    feed_all(&mut mltk, &sine(8.0, 0.5, 512));
    let err = match mltk.tick() {
        Err(Error::Tick(err)) => err,
        other => panic!("expected a tick error, got {:?}", other),
    };

    assert_eq!(err.failures.len(), 1);
    assert!(err.failed(Channel::Index(1)));
    assert!(matches!(
        err.failures[0].error,
        RunError::NodeInput(ref e) if e.node == "spectrum"
    ));

    assert_eq!(mltk.get_vector("Spectrum", Channel::Mono).unwrap().len(), 257);
    assert_eq!(mltk.get_vector("Spectrum", 0).unwrap().len(), 257);
    assert!(matches!(
        mltk.get_vector("Spectrum", 1),
        Err(Error::PoolKeyNotFound { .. })
    ));
    // Nodes ahead of the failure already published.
    assert!(mltk.exists("RMS", 1).unwrap());

    // The aggregate phase still ran everywhere.
    for channel in [Channel::Mono, Channel::Index(0), Channel::Index(1)] {
        assert!(mltk.aggregate(channel).unwrap().is_some());
    }
    assert_eq!(mltk.ticks(), 1);
}

#[test]
/// Before the first tick every key is unknown, mono included
fn fresh_engine_has_no_keys() {
    let mltk = Mltk::standard(MltkConfig::default()).unwrap();
    assert!(matches!(
        mltk.get_value("NoSuchKey", Channel::Mono),
        Err(Error::PoolKeyNotFound { ref key }) if key == "NoSuchKey"
    ));
    assert!(matches!(
        mltk.get_value(keys::RMS, Channel::Mono),
        Err(Error::PoolKeyNotFound { .. })
    ));
}

#[test]
/// Queries for unknown keys, wrong kinds and bad channels
fn query_errors() {
    let mut mltk = Mltk::standard(MltkConfig::default()).unwrap();
    feed_all(&mut mltk, &sine(8.0, 0.5, 512));
    mltk.tick().unwrap();

    assert!(matches!(
        mltk.get_value("NoSuchKey", 0),
        Err(Error::PoolKeyNotFound { ref key }) if key == "NoSuchKey"
    ));
    assert!(!mltk.exists("NoSuchKey", Channel::Mono).unwrap());

    assert!(matches!(
        mltk.get_value(keys::SPECTRUM, 0),
        Err(Error::ValueKind { .. })
    ));
    assert!(matches!(
        mltk.get_vector(keys::RMS, 0),
        Err(Error::ValueKind { .. })
    ));

    assert!(matches!(
        mltk.get_value(keys::RMS, 2),
        Err(Error::ChannelIndexOutOfRange { channels: 2, .. })
    ));
    assert!(matches!(
        mltk.ingest(7, &[0.0; 512]),
        Err(Error::ChannelIndexOutOfRange { .. })
    ));
    assert!(matches!(
        mltk.ingest(0, &[0.0; 100]),
        Err(Error::BlockLength { expected: 512, got: 100 })
    ));
}

#[test]
/// Wiring mistakes abort construction
fn graph_configuration_errors() {
    let config = MltkConfig::default;

    let cycle = Mltk::new(config(), |_, b| {
        b.add("a", Windowing::new(WindowKind::Square))?;
        b.add("b", Windowing::new(WindowKind::Square))?;
        b.connect(("a", "frame"), ("b", "frame"))?;
        b.connect(("b", "frame"), ("a", "frame"))
    });
    assert!(matches!(
        cycle,
        Err(Error::GraphConfiguration(GraphConfigError::Cycle { .. }))
    ));

    let unconnected = Mltk::new(config(), |_, b| b.add("rms", Rms::new()).map(drop));
    assert!(matches!(
        unconnected,
        Err(Error::GraphConfiguration(GraphConfigError::UnconnectedInput { .. }))
    ));

    let duplicate = Mltk::new(config(), |_, b| {
        b.add("rms", Rms::new())?;
        b.add("rms", Rms::new()).map(drop)
    });
    assert!(matches!(
        duplicate,
        Err(Error::GraphConfiguration(GraphConfigError::DuplicateNode(_)))
    ));

    let unknown = Mltk::new(config(), |_, b| b.store(("nope", "out"), "X"));
    assert!(matches!(
        unknown,
        Err(Error::GraphConfiguration(GraphConfigError::UnknownNode(_)))
    ));
}

#[test]
/// Blocks pushed into a capture feed are ingested and ticked in order
fn drain_capture_feed() {
    let config = MltkConfig::default().with_frame_size(64).with_hop_size(64);
    let mut mltk = Mltk::new(config, window_rms).unwrap();
    let (mut tx, mut rx) = capture::feed(2, 64, 4);

    // Left channel silent, right channel a full-scale square wave
    let block: Vec<f32> = (0..128).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
    for _ in 0..3 {
        assert_eq!(tx.push_interleaved(&block), 128);
    }
    tx.push_interleaved(&block[..10]);

    assert_eq!(mltk.drain(&mut rx).unwrap(), 3);
    assert_eq!(mltk.ticks(), 3);
    assert_eq!(mltk.get_value("RMS", 0).unwrap(), 0.0);
    assert!((mltk.get_value("RMS", 1).unwrap() - 1.0).abs() < 1e-5);
    assert!((mltk.get_value("RMS", Channel::Mono).unwrap() - 0.5).abs() < 1e-5);

    // The partial block waits for the rest.
    assert_eq!(mltk.drain(&mut rx).unwrap(), 0);

    let (_, mut mono_rx) = capture::feed(1, 64, 4);
    assert!(matches!(mltk.drain(&mut mono_rx), Err(Error::InvalidConfig(_))));
}

proptest! {
    #[test]
    /// Identical input gives identical pools in independently built engines
    fn identical_input_identical_results(
        left in prop::collection::vec(-1.0f32..1.0, 64),
        right in prop::collection::vec(-1.0f32..1.0, 64),
    ) {
        let config = MltkConfig::default().with_frame_size(64).with_hop_size(32);
        let mut a = Mltk::standard(config.clone()).unwrap();
        let mut b = Mltk::new(config, |_, builder| network::standard(builder)).unwrap();

        for _ in 0..3 {
            for m in [&mut a, &mut b] {
                m.ingest(0, &left).unwrap();
                m.ingest(1, &right).unwrap();
                m.tick().unwrap();
            }
        }

        for channel in [Channel::Mono, Channel::Index(0), Channel::Index(1)] {
            for key in keys::ALL {
                prop_assert_eq!(
                    a.get_series(key, channel).unwrap(),
                    b.get_series(key, channel).unwrap()
                );
            }
        }
    }
}
