//! Beat-driven particles.
//!
//! Every particle is the same struct; its [`ParticleKind`] picks the motion
//! and the primitive it draws as. Spawning draws from a seeded `StdRng`, so
//! two systems fed the same ticks end up in the same state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use super::effects::VisualEffects;
use super::palette::ColorScheme;
use super::scene::Primitive;
use crate::audio::FeatureVector;

const GRAVITY: f32 = 240.0;
const SPARK_DRAG: f32 = 0.9;
const RING_GROWTH: f32 = 220.0;
const DUST_RISE: f32 = 30.0;
/// Upper bound on sparks per beat
const MAX_BURST: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleKind {
    /// Burst outward on a beat, falls under gravity
    Spark,
    /// Expanding outline on a kick
    Ring,
    /// Slow drift fed by high-frequency content
    Dust,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    /// Seconds left to live
    pub life: f32,
    pub max_life: f32,
    /// Position along the color scheme (0.0-1.0)
    pub hue: f32,
}

impl Particle {
    /// 1.0 at spawn, 0.0 at death
    pub fn alpha(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 0.0;
        }
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// Advances by `dt` seconds; returns false once the particle is dead.
    pub fn update(&mut self, dt: f32, effects: &VisualEffects) -> bool {
        self.life -= dt;
        if self.life <= 0.0 {
            return false;
        }
        match self.kind {
            ParticleKind::Spark => {
                self.vy += GRAVITY * dt;
                let drag = SPARK_DRAG.powf(dt * 10.0);
                self.vx *= drag;
                self.vy *= drag;
                self.x += self.vx * dt;
                self.y += self.vy * dt;
            }
            ParticleKind::Ring => {
                self.size += RING_GROWTH * dt * (1.0 + effects.kick_pulse);
            }
            ParticleKind::Dust => {
                self.x += self.vx * dt;
                self.y -= (DUST_RISE + 60.0 * effects.hihat_pulse) * dt;
            }
        }
        true
    }

    pub fn draw(&self, scheme: ColorScheme, shift: f32) -> Primitive {
        let alpha = self.alpha();
        let color = scheme.color(self.hue, shift, alpha).with_alpha(alpha);
        match self.kind {
            ParticleKind::Spark => Primitive::Circle {
                x: self.x,
                y: self.y,
                radius: self.size * (0.5 + 0.5 * alpha),
                color,
                filled: true,
            },
            ParticleKind::Ring => Primitive::Circle {
                x: self.x,
                y: self.y,
                radius: self.size,
                color,
                filled: false,
            },
            ParticleKind::Dust => Primitive::Rect {
                x: self.x - self.size / 2.0,
                y: self.y - self.size / 2.0,
                width: self.size,
                height: self.size,
                color,
            },
        }
    }
}

pub struct ParticleSystem {
    particles: Vec<Particle>,
    max_particles: usize,
    width: f32,
    height: f32,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new(max_particles: usize, width: u32, height: u32, seed: u64) -> Self {
        Self {
            particles: Vec::with_capacity(max_particles),
            max_particles,
            width: width as f32,
            height: height as f32,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Ages every particle, then spawns for this tick's events.
    ///
    /// A pulse sitting at exactly 1.0 means its event fired this tick.
    pub fn update(&mut self, dt: f32, effects: &VisualEffects, features: &FeatureVector) {
        let dt = dt.max(0.0);
        self.particles.retain_mut(|p| p.update(dt, effects));

        if effects.flash >= 1.0 {
            let count = ((features.energy * MAX_BURST as f32).ceil() as usize).clamp(4, MAX_BURST);
            self.burst(count, features.spectral_centroid);
        }
        if effects.kick_pulse >= 1.0 {
            self.spawn_ring(features.bass);
        }
        // max/min rather than clamp so a NaN band reads as no dust
        let dust = ((features.treble + features.brilliance) * 2.0).max(0.0).min(1.0);
        if !features.silent && self.rng.random_bool(f64::from(dust)) {
            self.spawn_dust(features.spectral_centroid);
        }

        // Oldest particles give way first
        if self.particles.len() > self.max_particles {
            let excess = self.particles.len() - self.max_particles;
            self.particles.drain(..excess);
        }
    }

    pub fn draw(&self, scheme: ColorScheme, shift: f32) -> Vec<Primitive> {
        self.particles.iter().map(|p| p.draw(scheme, shift)).collect()
    }

    fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    fn burst(&mut self, count: usize, hue: f32) {
        let (cx, cy) = self.center();
        for _ in 0..count {
            let angle = self.rng.random::<f32>() * TAU;
            let speed = self.rng.random_range(120.0..420.0);
            let life = self.rng.random_range(0.6..1.4);
            self.particles.push(Particle {
                kind: ParticleKind::Spark,
                x: cx,
                y: cy,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                size: self.rng.random_range(2.0..6.0),
                life,
                max_life: life,
                hue: (hue + self.rng.random_range(-0.1..0.1)).clamp(0.0, 1.0),
            });
        }
    }

    fn spawn_ring(&mut self, bass: f32) {
        let (cx, cy) = self.center();
        let life = 0.8;
        self.particles.push(Particle {
            kind: ParticleKind::Ring,
            x: cx,
            y: cy,
            vx: 0.0,
            vy: 0.0,
            size: 20.0 + 60.0 * bass.clamp(0.0, 1.0),
            life,
            max_life: life,
            hue: 0.0,
        });
    }

    fn spawn_dust(&mut self, hue: f32) {
        let life = self.rng.random_range(1.5..3.0);
        self.particles.push(Particle {
            kind: ParticleKind::Dust,
            x: self.rng.random::<f32>() * self.width,
            y: self.height,
            vx: self.rng.random_range(-20.0..20.0),
            vy: 0.0,
            size: self.rng.random_range(1.0..3.0),
            life,
            max_life: life,
            hue,
        });
    }
}
