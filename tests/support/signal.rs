use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SAMPLE_RATE: u32 = 44_100;

/// Low noise bed with loud noise bursts every `period_secs`, starting at
/// `period_secs`.
pub fn click_track(seconds: f32, period_secs: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let len = (seconds * SAMPLE_RATE as f32) as usize;
    let period = (period_secs * SAMPLE_RATE as f32) as usize;
    let burst = SAMPLE_RATE as usize / 10;
    (0..len)
        .map(|i| {
            let in_burst = i >= period && i % period < burst;
            let amplitude = if in_burst { 0.5 } else { 0.01 };
            rng.random_range(-amplitude..amplitude)
        })
        .collect()
}

/// Random spectrum frames with an occasional loud tick.
pub fn noisy_frames(ticks: usize, bins: usize, seed: u64) -> Vec<(Vec<f32>, Vec<f32>, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..ticks)
        .map(|t| {
            let gain = if rng.random_bool(0.15) { 1.0 } else { 0.3 };
            let frequency = (0..bins).map(|_| rng.random::<f32>() * gain).collect();
            let time = (0..bins).map(|_| rng.random_range(-1.0..1.0) * gain).collect();
            (frequency, time, t as f64 * 1000.0 / 60.0)
        })
        .collect()
}
