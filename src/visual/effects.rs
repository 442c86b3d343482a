//! Decaying pulse state driven by detected events.

use serde::Serialize;

use crate::audio::{BeatResult, FeatureVector};

pub const FLASH_DECAY: f32 = 0.85;
pub const KICK_DECAY: f32 = 0.8;
pub const SNARE_DECAY: f32 = 0.7;
pub const HIHAT_DECAY: f32 = 0.6;

/// Pulses jump to 1.0 on their event and decay multiplicatively otherwise.
/// Shorter percussive events fade faster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct VisualEffects {
    pub flash: f32,
    pub kick_pulse: f32,
    pub snare_pulse: f32,
    pub hihat_pulse: f32,
    /// Hue offset in degrees, follows spectral centroid
    pub color_shift: f32,
}

fn pulse(current: f32, fired: bool, decay: f32) -> f32 {
    if fired {
        1.0
    } else {
        (current * decay).max(0.0)
    }
}

impl VisualEffects {
    pub fn update(&mut self, features: &FeatureVector, beat: &BeatResult) {
        self.flash = pulse(self.flash, beat.beat, FLASH_DECAY);
        self.kick_pulse = pulse(self.kick_pulse, beat.kick, KICK_DECAY);
        self.snare_pulse = pulse(self.snare_pulse, beat.snare, SNARE_DECAY);
        self.hihat_pulse = pulse(self.hihat_pulse, beat.hihat, HIHAT_DECAY);
        self.color_shift = features.spectral_centroid * 360.0;
    }

    /// Size multiplier for shapes, swells on kicks and beats.
    pub fn scale(&self) -> f32 {
        1.0 + 0.35 * self.kick_pulse + 0.15 * self.flash
    }

    /// Extra brightness (0.0-1.0) from the faster percussive pulses.
    pub fn sparkle(&self) -> f32 {
        (0.6 * self.snare_pulse + 0.4 * self.hihat_pulse).min(1.0)
    }
}
