use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::f32::consts::PI;
use std::time::Duration;

use voice_biomarkers::error::Deadline;
use voice_biomarkers::preprocess::preprocess;
use voice_biomarkers::{analyze, AnalysisConfig};

const SAMPLE_RATE: u32 = 16000;

/// Speech-like mixed signal: modulated fundamental with harmonics plus a
/// low noise floor
fn generate_speech_like(duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    let mut seed = 42u32;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let envelope = 0.55 + 0.45 * (2.0 * PI * 4.0 * t).cos();
            let voiced = (2.0 * PI * 140.0 * t).sin() * 0.4
                + (2.0 * PI * 280.0 * t).sin() * 0.2
                + (2.0 * PI * 420.0 * t).sin() * 0.1;
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            let noise = ((seed >> 16) as f32 / 32768.0 - 1.0) * 0.02;
            voiced * envelope + noise
        })
        .collect()
}

fn benchmark_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("Full Analysis");
    let config = AnalysisConfig::default();

    for duration in [1.0f32, 5.0, 15.0, 30.0].iter() {
        let samples = generate_speech_like(*duration);
        group.bench_with_input(
            BenchmarkId::new("speech_like_secs", duration),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let _ = black_box(analyze(black_box(samples), SAMPLE_RATE, &config));
                });
            },
        );
    }

    group.finish();
}

fn benchmark_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocessing");
    let config = AnalysisConfig::default();

    for duration in [5.0f32, 30.0].iter() {
        let samples = generate_speech_like(*duration);
        group.bench_with_input(
            BenchmarkId::new("frame_features_secs", duration),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let deadline = Deadline::new(Duration::from_secs(60));
                    let _ = black_box(preprocess(
                        black_box(samples),
                        SAMPLE_RATE,
                        &config.frame,
                        &deadline,
                    ));
                });
            },
        );
    }

    group.finish();
}

fn benchmark_sine_vs_noise(c: &mut Criterion) {
    let mut group = c.benchmark_group("Signal Types");
    let config = AnalysisConfig::default();

    let sine: Vec<f32> = (0..SAMPLE_RATE as usize * 5)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            (2.0 * PI * 150.0 * t).sin() * 0.5
        })
        .collect();
    group.bench_function("sine_150hz_5s", |b| {
        b.iter(|| {
            let _ = black_box(analyze(black_box(&sine), SAMPLE_RATE, &config));
        });
    });

    let mut seed = 12345u32;
    let noise: Vec<f32> = (0..SAMPLE_RATE as usize * 5)
        .map(|_| {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            ((seed >> 16) as f32 / 32768.0 - 1.0) * 0.3
        })
        .collect();
    group.bench_function("white_noise_5s", |b| {
        b.iter(|| {
            let _ = black_box(analyze(black_box(&noise), SAMPLE_RATE, &config));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_end_to_end,
    benchmark_preprocessing,
    benchmark_sine_vs_noise
);
criterion_main!(benches);
