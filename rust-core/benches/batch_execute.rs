use batched_spectrum::{EngineConfig, SpectrumEngine, WindowFunction};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Deterministic pseudo-noise so runs are comparable
fn test_signal(len: usize) -> Vec<i16> {
    let mut state = 0x2545_f491u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 16) as i16
        })
        .collect()
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute");

    for &batch_count in &[1usize, 4, 8] {
        let frame_size = 2048;
        let config = EngineConfig::default()
            .with_window(WindowFunction::Hann)
            .with_frame_size(frame_size)
            .with_batch_count(batch_count);

        let mut engine: SpectrumEngine = SpectrumEngine::new(config);
        engine.initialize().expect("engine init");
        let samples = test_signal(frame_size * batch_count);

        group.bench_with_input(BenchmarkId::from_parameter(batch_count), &samples, |b, samples| {
            b.iter(|| black_box(engine.execute(black_box(samples))));
        });
    }

    group.finish();
}

fn bench_read_bins(c: &mut Criterion) {
    let config = EngineConfig::default().with_frame_size(4096).with_batch_count(2);
    let mut engine: SpectrumEngine = SpectrumEngine::new(config);
    engine.initialize().expect("engine init");
    engine.execute(&test_signal(8192));

    c.bench_function("magnitudes", |b| b.iter(|| black_box(engine.magnitudes())));
}

criterion_group!(benches, bench_execute, bench_read_bins);
criterion_main!(benches);
