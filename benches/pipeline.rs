use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use beatscope::audio::AudioPipeline;
use beatscope::config::AnalysisConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FFT_SIZES: [usize; 3] = [512, 1024, 2048];

fn frame(bins: usize, rng: &mut StdRng) -> (Vec<f32>, Vec<f32>) {
    let frequency = (0..bins).map(|_| rng.random::<f32>()).collect();
    let time = (0..bins).map(|_| rng.random_range(-1.0..1.0)).collect();
    (frequency, time)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_tick");
    for fft_size in FFT_SIZES {
        let config = AnalysisConfig {
            fft_size,
            ..AnalysisConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(42);
        let frames: Vec<_> = (0..64).map(|_| frame(config.bin_count(), &mut rng)).collect();
        let mut pipeline = AudioPipeline::new(config).expect("pipeline");
        let mut tick = 0u64;

        group.bench_with_input(BenchmarkId::from_parameter(fft_size), &frames, |b, frames| {
            b.iter(|| {
                let (frequency, time) = &frames[(tick % frames.len() as u64) as usize];
                let timestamp = tick as f64 * 1000.0 / 60.0;
                tick += 1;
                pipeline
                    .tick(black_box(frequency), black_box(time), timestamp)
                    .expect("tick")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
