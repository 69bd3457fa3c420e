//! EQ engine benchmarks
//!
//! Measures the full per-block path of the processor.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use heron_core::{EngineConfig, EqController, ProcessingMode};

fn benchmark_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("eq_processor");

    for mode in [ProcessingMode::ZeroLatency, ProcessingMode::Oversampled] {
        // Typical buffer sizes used in real-time audio
        for buffer_size in [64, 128, 256, 512, 1024] {
            let mut config = EngineConfig {
                initial_mode: mode,
                ..EngineConfig::default()
            };
            config.stream.max_block_size = buffer_size as u32;
            let (controller, mut processor) = EqController::new(config).unwrap();
            processor.prepare(48_000.0, buffer_size, 2).unwrap();
            for band in 0..7 {
                controller
                    .set_band_target(band, 100.0 * (band + 1) as f32 * 2.0, 3.0, 1.0)
                    .unwrap();
            }

            // Create test buffer (stereo interleaved)
            let mut buffer: Vec<f32> = (0..buffer_size * 2)
                .map(|i| (i as f32 * 0.001).sin())
                .collect();

            group.throughput(Throughput::Elements(buffer_size as u64 * 2));
            group.bench_function(format!("{:?}_{}_frames", mode, buffer_size), |b| {
                b.iter(|| {
                    processor.try_process(black_box(&mut buffer)).unwrap();
                })
            });
        }
    }

    group.finish();
}

fn benchmark_parameter_sweep(c: &mut Criterion) {
    // Continuous automation: every block re-designs every band
    let (controller, mut processor) = EqController::new(EngineConfig::default()).unwrap();
    processor.prepare(48_000.0, 256, 2).unwrap();
    let mut buffer = vec![0.1_f32; 256 * 2];
    let mut gain = 0.0_f32;

    c.bench_function("parameter_sweep_256", |b| {
        b.iter(|| {
            gain = if gain > 12.0 { -12.0 } else { gain + 0.5 };
            controller.set_band_target(3, 1000.0, gain, 1.0).unwrap();
            processor.try_process(black_box(&mut buffer)).unwrap();
        })
    });
}

fn benchmark_response_query(c: &mut Criterion) {
    let (controller, _processor) = EqController::new(EngineConfig::default()).unwrap();
    c.bench_function("response_curve_256", |b| {
        b.iter(|| black_box(controller.response_curve(256)))
    });
}

criterion_group!(
    benches,
    benchmark_processor,
    benchmark_parameter_sweep,
    benchmark_response_query
);
criterion_main!(benches);
