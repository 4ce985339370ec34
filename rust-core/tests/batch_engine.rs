//! End-to-end tests through the public API

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use batched_spectrum::{
    ComplexFftBackend, EngineConfig, InitStatus, SpectrumEngine, SpectrumError, WindowFunction,
};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

fn tone(bin: usize, frame_size: usize, padded: usize, amplitude: f64) -> Vec<i16> {
    (0..frame_size)
        .map(|n| {
            let phase = 2.0 * PI * bin as f64 * n as f64 / padded as f64;
            (phase.sin() * amplitude * 32767.0).round() as i16
        })
        .collect()
}

#[test]
fn sine_at_one_bin_dominates() {
    init_tracing();
    let mut engine: SpectrumEngine = SpectrumEngine::new(EngineConfig::new(WindowFunction::Rectangle, 8000, 8, 0, 1));
    assert_eq!(engine.initialize(), Ok(InitStatus::Initialized));

    // 1000 Hz = bin 1
    assert!(engine.execute(&tone(1, 8, 8, 0.9)));

    let peak = engine.bin_value_single(1);
    assert!((peak - 0.9).abs() < 1e-3);
    for bin in [0, 2, 3, 4] {
        assert!(engine.bin_value_single(bin) < 1e-3);
    }
}

#[test]
fn many_slots_keep_their_own_frequency() {
    init_tracing();
    let frame_size = 512;
    let batch_count = 8;
    let config = EngineConfig::default()
        .with_window(WindowFunction::BlackmanHarris)
        .with_sample_rate(48000)
        .with_frame_size(frame_size)
        .with_batch_count(batch_count);

    let mut engine: SpectrumEngine = SpectrumEngine::new(config);
    engine.initialize().unwrap();

    let bins: Vec<usize> = (0..batch_count).map(|k| 200 - 23 * k).collect();
    let samples: Vec<i16> = bins.iter().flat_map(|&b| tone(b, frame_size, frame_size, 0.5)).collect();

    for _ in 0..3 {
        assert!(engine.execute(&samples));
        let magnitudes = engine.magnitudes();
        assert_eq!(magnitudes.dim(), (batch_count, 257));

        for (slot, &bin) in bins.iter().enumerate() {
            assert_eq!(engine.peak_bin(slot), bin, "slot {}", slot);
            assert!((magnitudes[[slot, bin]] - 0.5).abs() < 0.01);
        }
    }
}

#[test]
fn zero_padding_interpolates_the_spectrum() {
    init_tracing();
    // 100 real samples padded to 400: a tone at padded bin 40 peaks there
    let config = EngineConfig::new(WindowFunction::Hann, 4000, 100, 400, 1);
    let mut engine: SpectrumEngine = SpectrumEngine::new(config);
    engine.initialize().unwrap();

    assert_eq!(engine.bin_count(), 200);
    assert_eq!(engine.bin_frequency(40), 400.0);

    assert!(engine.execute(&tone(40, 100, 400, 0.7)));
    assert_eq!(engine.peak_bin(0), 40);
    assert!((engine.bin_value(0, 40) - 0.7).abs() < 0.02);
}

#[test]
fn invalid_configuration_poisons_the_engine() {
    init_tracing();
    let mut engine: SpectrumEngine = SpectrumEngine::new(EngineConfig::new(WindowFunction::Rectangle, 8000, 8, 4, 1));

    let err = engine.initialize().unwrap_err();
    assert!(matches!(err, SpectrumError::InvalidArgument(_)));
    assert!(err.is_fatal());

    for _ in 0..3 {
        assert_eq!(engine.initialize(), Err(SpectrumError::PreviousInitializeFailed));
        assert!(!engine.execute(&[0; 8]));
    }
}

#[test]
fn hook_sees_every_bin_read() {
    init_tracing();
    let mut engine: SpectrumEngine = SpectrumEngine::new(EngineConfig::new(WindowFunction::Welch, 16000, 32, 0, 2));
    engine.initialize().unwrap();
    assert!(engine.execute(&[0; 64]));

    let reads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reads);
    engine.set_bin_hook(move |_, value| {
        counter.fetch_add(1, Ordering::Relaxed);
        *value = -1.0;
    });

    let spectrum = engine.spectrum(1);
    assert_eq!(spectrum.len(), 17);
    assert!(spectrum.iter().all(|&v| v == -1.0));
    assert_eq!(reads.load(Ordering::Relaxed), 17);
}

#[test]
fn engines_share_the_plan_lock_safely() {
    init_tracing();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let config = EngineConfig::new(WindowFunction::Hamming, 8000, 128, 0, 3);
                let mut engine: SpectrumEngine<ComplexFftBackend> = SpectrumEngine::new(config);
                engine.initialize().unwrap();

                let samples: Vec<i16> = (0..3).flat_map(|k| tone(5 + i + k, 128, 128, 0.5)).collect();
                for _ in 0..50 {
                    assert!(engine.execute(&samples));
                }
                (0..3).map(|k| engine.peak_bin(k)).collect::<Vec<_>>()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let peaks = handle.join().unwrap();
        assert_eq!(peaks, vec![5 + i, 6 + i, 7 + i]);
    }
}

#[test]
fn drop_mid_life_releases_workers() {
    init_tracing();
    for _ in 0..50 {
        let mut engine: SpectrumEngine = SpectrumEngine::new(EngineConfig::default().with_frame_size(64).with_batch_count(4));
        engine.initialize().unwrap();
        assert!(engine.execute(&[1; 256]));
    }
}
