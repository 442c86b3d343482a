//! Maps one tick's analysis onto backend-agnostic draw primitives.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, TAU};

use super::effects::VisualEffects;
use super::palette::{ColorScheme, Rgba};
use super::particles::ParticleSystem;
use crate::audio::TickSnapshot;

const BAR_COUNT: usize = 64;
const SPOKE_COUNT: usize = 128;
const MAX_POINTS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Bars,
    Particles,
    Spectrum,
    Circular,
    Waveform,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Primitive {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba,
    },
    Circle {
        x: f32,
        y: f32,
        radius: f32,
        color: Rgba,
        filled: bool,
    },
    Line {
        from: [f32; 2],
        to: [f32; 2],
        width: f32,
        color: Rgba,
    },
    Polyline {
        points: Vec<[f32; 2]>,
        width: f32,
        color: Rgba,
    },
}

/// Borrowed view of everything a scene is drawn from.
pub struct SceneInput<'a> {
    pub frequency: &'a [f32],
    pub time: &'a [f32],
    pub snapshot: &'a TickSnapshot,
    pub effects: &'a VisualEffects,
    pub particles: &'a ParticleSystem,
    pub scheme: ColorScheme,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrimitiveCounts {
    pub rects: usize,
    pub circles: usize,
    pub lines: usize,
    pub polylines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub mode: RenderMode,
    pub width: u32,
    pub height: u32,
    pub background: Rgba,
    pub primitives: Vec<Primitive>,
}

impl Scene {
    pub fn build(mode: RenderMode, input: &SceneInput) -> Self {
        let mut primitives = Vec::new();
        match mode {
            RenderMode::Bars => bars(input, &mut primitives),
            RenderMode::Particles => particles(input, &mut primitives),
            RenderMode::Spectrum => spectrum(input, &mut primitives),
            RenderMode::Circular => circular(input, &mut primitives),
            RenderMode::Waveform => waveform(input, &mut primitives),
        }
        flash(input, &mut primitives);

        Self {
            mode,
            width: input.width,
            height: input.height,
            background: input.scheme.background(),
            primitives,
        }
    }

    pub fn counts(&self) -> PrimitiveCounts {
        let mut counts = PrimitiveCounts::default();
        for primitive in &self.primitives {
            match primitive {
                Primitive::Rect { .. } => counts.rects += 1,
                Primitive::Circle { .. } => counts.circles += 1,
                Primitive::Line { .. } => counts.lines += 1,
                Primitive::Polyline { .. } => counts.polylines += 1,
            }
        }
        counts
    }
}

/// Mean magnitude of each of `count` equal slices of `values`.
fn group(values: &[f32], count: usize) -> Vec<f32> {
    if values.is_empty() || count == 0 {
        return Vec::new();
    }
    let count = count.min(values.len());
    (0..count)
        .map(|i| {
            let start = i * values.len() / count;
            let end = ((i + 1) * values.len() / count).max(start + 1);
            let slice = &values[start..end];
            slice.iter().sum::<f32>() / slice.len() as f32
        })
        .collect()
}

/// Evenly spaced picks from `values`, at most `limit` of them.
fn downsample(values: &[f32], limit: usize) -> Vec<(usize, f32)> {
    let step = values.len().div_ceil(limit.max(1)).max(1);
    values.iter().copied().enumerate().step_by(step).collect()
}

fn brightness(input: &SceneInput) -> f32 {
    (input.snapshot.features.energy + input.effects.sparkle()).min(1.0)
}

fn bars(input: &SceneInput, out: &mut Vec<Primitive>) {
    let levels = group(input.frequency, BAR_COUNT);
    if levels.is_empty() {
        return;
    }
    let width = input.width as f32;
    let height = input.height as f32;
    let slot = width / levels.len() as f32;
    let scale = input.effects.scale();
    let light = brightness(input);

    for (i, level) in levels.iter().enumerate() {
        let bar_height = (level * height * 0.8 * scale).min(height);
        let position = i as f32 / levels.len() as f32;
        out.push(Primitive::Rect {
            x: i as f32 * slot + slot * 0.1,
            y: height - bar_height,
            width: slot * 0.8,
            height: bar_height,
            color: input.scheme.color(position, input.effects.color_shift, light),
        });
    }
}

fn particles(input: &SceneInput, out: &mut Vec<Primitive>) {
    let core = input.width.min(input.height) as f32 * 0.05 * input.effects.scale();
    let light = brightness(input);
    out.push(Primitive::Circle {
        x: input.width as f32 / 2.0,
        y: input.height as f32 / 2.0,
        radius: core,
        color: input.scheme.color(input.snapshot.features.spectral_centroid, input.effects.color_shift, light),
        filled: true,
    });
    out.extend(input.particles.draw(input.scheme, input.effects.color_shift));
}

fn spectrum(input: &SceneInput, out: &mut Vec<Primitive>) {
    if input.frequency.is_empty() {
        return;
    }
    let width = input.width as f32;
    let height = input.height as f32;
    let last = (input.frequency.len() - 1).max(1) as f32;
    let points = downsample(input.frequency, MAX_POINTS)
        .into_iter()
        .map(|(i, m)| [i as f32 / last * width, height - m * height * 0.8 * input.effects.scale()])
        .collect();

    out.push(Primitive::Line {
        from: [0.0, height],
        to: [width, height],
        width: 1.0,
        color: input.scheme.color(0.0, input.effects.color_shift, 0.2),
    });
    out.push(Primitive::Polyline {
        points,
        width: 2.0 + 2.0 * input.effects.kick_pulse,
        color: input.scheme.color(0.5, input.effects.color_shift, brightness(input)),
    });
}

fn circular(input: &SceneInput, out: &mut Vec<Primitive>) {
    let cx = input.width as f32 / 2.0;
    let cy = input.height as f32 / 2.0;
    let base = input.width.min(input.height) as f32 * 0.2 * input.effects.scale();
    let light = brightness(input);

    out.push(Primitive::Circle {
        x: cx,
        y: cy,
        radius: base,
        color: input.scheme.color(0.0, input.effects.color_shift, light),
        filled: false,
    });

    let levels = group(input.frequency, SPOKE_COUNT);
    for (i, level) in levels.iter().enumerate() {
        let position = i as f32 / levels.len() as f32;
        // Start at twelve o'clock
        let angle = position * TAU - FRAC_PI_2;
        let (sin, cos) = angle.sin_cos();
        let outer = base + level * base;
        out.push(Primitive::Line {
            from: [cx + cos * base, cy + sin * base],
            to: [cx + cos * outer, cy + sin * outer],
            width: 2.0,
            color: input.scheme.color(position, input.effects.color_shift, light),
        });
    }
}

fn waveform(input: &SceneInput, out: &mut Vec<Primitive>) {
    if input.time.is_empty() {
        return;
    }
    let width = input.width as f32;
    let mid = input.height as f32 / 2.0;
    let amplitude = mid * 0.8 * input.effects.scale();
    let last = (input.time.len() - 1).max(1) as f32;
    let points = downsample(input.time, MAX_POINTS)
        .into_iter()
        .map(|(i, s)| [i as f32 / last * width, mid - s.clamp(-1.0, 1.0) * amplitude])
        .collect();

    out.push(Primitive::Polyline {
        points,
        width: 2.0 + 3.0 * input.effects.snare_pulse,
        color: input.scheme.color(input.snapshot.features.spectral_centroid, input.effects.color_shift, brightness(input)),
    });
}

/// Full-screen wash while the beat flash is visible.
fn flash(input: &SceneInput, out: &mut Vec<Primitive>) {
    if input.effects.flash < 0.05 {
        return;
    }
    out.push(Primitive::Rect {
        x: 0.0,
        y: 0.0,
        width: input.width as f32,
        height: input.height as f32,
        color: Rgba::new(255, 255, 255, 255).with_alpha(input.effects.flash * 0.2),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        frequency: Vec<f32>,
        time: Vec<f32>,
        snapshot: TickSnapshot,
        effects: VisualEffects,
        particles: ParticleSystem,
    }

    impl Fixture {
        fn new(bins: usize) -> Self {
            Self {
                frequency: (0..bins).map(|i| i as f32 / bins.max(1) as f32).collect(),
                time: (0..bins).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect(),
                snapshot: TickSnapshot::default(),
                effects: VisualEffects::default(),
                particles: ParticleSystem::new(100, 800, 600, 3),
            }
        }

        fn build(&self, mode: RenderMode) -> Scene {
            Scene::build(
                mode,
                &SceneInput {
                    frequency: &self.frequency,
                    time: &self.time,
                    snapshot: &self.snapshot,
                    effects: &self.effects,
                    particles: &self.particles,
                    scheme: ColorScheme::Rainbow,
                    width: 800,
                    height: 600,
                },
            )
        }
    }

    #[test]
    fn bars_fill_the_width() {
        let scene = Fixture::new(1024).build(RenderMode::Bars);
        assert_eq!(scene.counts().rects, BAR_COUNT);
        for primitive in &scene.primitives {
            if let Primitive::Rect { y, height, .. } = primitive {
                assert!(*height >= 0.0 && *height <= 600.0);
                assert!((y + height - 600.0).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn fewer_bins_than_bars() {
        let scene = Fixture::new(16).build(RenderMode::Bars);
        assert_eq!(scene.counts().rects, 16);
    }

    #[test]
    fn empty_input_draws_nothing() {
        let fixture = Fixture::new(0);
        for mode in [RenderMode::Bars, RenderMode::Spectrum, RenderMode::Waveform] {
            assert!(fixture.build(mode).primitives.is_empty(), "{mode:?}");
        }
    }

    #[test]
    fn circular_has_ring_and_spokes() {
        let counts = Fixture::new(1024).build(RenderMode::Circular).counts();
        assert_eq!(counts.circles, 1);
        assert_eq!(counts.lines, SPOKE_COUNT);
    }

    #[test]
    fn polylines_are_downsampled() {
        let fixture = Fixture::new(2048);
        for mode in [RenderMode::Spectrum, RenderMode::Waveform] {
            let scene = fixture.build(mode);
            let points = scene.primitives.iter().find_map(|p| match p {
                Primitive::Polyline { points, .. } => Some(points.len()),
                _ => None,
            });
            assert_eq!(points, Some(MAX_POINTS), "{mode:?}");
        }
    }

    #[test]
    fn flash_adds_overlay() {
        let mut fixture = Fixture::new(64);
        fixture.effects.flash = 1.0;
        let scene = fixture.build(RenderMode::Waveform);
        assert_eq!(scene.counts().rects, 1);
        assert_eq!(scene.counts().polylines, 1);
    }

    #[test]
    fn primitives_serialize_with_kind_tag() {
        let json = serde_json::to_value(Primitive::Circle {
            x: 1.0,
            y: 2.0,
            radius: 3.0,
            color: Rgba::new(1, 2, 3, 4),
            filled: true,
        })
        .unwrap();
        assert_eq!(json["kind"], "circle");
        assert_eq!(json["color"]["a"], 4);
    }
}
