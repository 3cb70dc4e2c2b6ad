use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mltk::nodes::{Mfcc, Spectrum, WindowKind, Windowing};
use mltk::{GraphBuilder, Mltk, MltkConfig, Pool, SOURCE};

fn block(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.031).sin() * 0.5).collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Mltk.tick() standard 2ch", |b| {
        let mut mltk = Mltk::standard(MltkConfig::default()).unwrap();
        let input = block(mltk.frame_size());

        b.iter(|| {
            mltk.ingest(0, &input).unwrap();
            mltk.ingest(1, &input).unwrap();
            mltk.tick().unwrap();
            black_box(mltk.get_value("RMS", 0).unwrap())
        })
    });

    c.bench_function("Mltk.tick() standard 2ch record", |b| {
        let config = MltkConfig::default().with_record(true);
        let mut mltk = Mltk::standard(config).unwrap();
        let input: Vec<f32> = block(mltk.frame_size() * 2);

        b.iter(|| {
            mltk.ingest_interleaved(&input).unwrap();
            mltk.tick().unwrap();
        })
    });

    c.bench_function("Graph.run() window -> spectrum -> mfcc", |b| {
        let ctx = MltkConfig::default().process_context();
        let mut builder = GraphBuilder::new(ctx);
        builder.add("window", Windowing::new(WindowKind::Hann)).unwrap();
        builder.add("spectrum", Spectrum::new(ctx.frame_size)).unwrap();
        builder.add("mfcc", Mfcc::new(ctx.sample_rate)).unwrap();
        builder.connect((SOURCE, SOURCE), ("window", "frame")).unwrap();
        builder.connect(("window", "frame"), ("spectrum", "frame")).unwrap();
        builder.connect(("spectrum", "spectrum"), ("mfcc", "spectrum")).unwrap();
        builder.store(("mfcc", "mfcc"), "MFCC").unwrap();
        let mut graph = builder.build().unwrap();

        let mut pool = Pool::new();
        let input = block(ctx.frame_size);

        b.iter(|| {
            pool.clear();
            graph.reset();
            graph.run(black_box(&input), &mut pool).unwrap();
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
