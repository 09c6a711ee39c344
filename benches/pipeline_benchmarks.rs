use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vinyl_restore::{AudioBuffer, AutoSettings, ProcessingSettings};

fn sine_with_impulses(n: usize, sample_rate: u32) -> Vec<f32> {
    let mut samples: Vec<f32> = (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.3
        })
        .collect();
    let mut i = 1_000;
    while i < n {
        samples[i] += 0.8;
        i += 4_999;
    }
    samples
}

fn bench_full_pipeline(c: &mut Criterion) {
    let samples = sine_with_impulses(44_100 * 5, 44_100);
    let buffer = AudioBuffer::new(samples, 1, 44_100).unwrap();
    let settings = ProcessingSettings::default();

    c.bench_function("process_5s_mono_auto", |b| {
        b.iter(|| vinyl_restore::process(black_box(&buffer), black_box(&settings)).unwrap())
    });
}

fn bench_denoise_disabled(c: &mut Criterion) {
    let samples = sine_with_impulses(44_100 * 5, 44_100);
    let buffer = AudioBuffer::new(samples, 1, 44_100).unwrap();
    let settings = ProcessingSettings::Auto(AutoSettings {
        use_spectral_noise_reduction: false,
        ..AutoSettings::default()
    });

    c.bench_function("process_5s_mono_no_denoise", |b| {
        b.iter(|| vinyl_restore::process(black_box(&buffer), black_box(&settings)).unwrap())
    });
}

criterion_group!(benches, bench_full_pipeline, bench_denoise_disabled);
criterion_main!(benches);
