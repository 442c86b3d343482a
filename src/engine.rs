//! One visualizer instance: an injected frame source driving the analysis
//! core, the effect pulses and the particles, tick by tick.

use std::time::Instant;

use crate::audio::quality::DEFAULT_BUDGET_MS;
use crate::audio::{AnalysisFrame, AudioPipeline, FrameSource, QualityGovernor, QualityLevel, TickSnapshot};
use crate::config::{AnalysisConfig, RenderConfig};
use crate::error::Result;
use crate::visual::{ParticleSystem, RenderMode, Scene, SceneInput, VisualEffects};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub analysis: AnalysisConfig,
    pub render: RenderConfig,
    /// Enables the quality governor with this per-tick budget
    pub budget_ms: Option<f32>,
}

impl EngineConfig {
    pub fn adaptive(mut self) -> Self {
        self.budget_ms = Some(DEFAULT_BUDGET_MS);
        self
    }
}

pub struct Engine<S: FrameSource> {
    source: S,
    pipeline: AudioPipeline,
    effects: VisualEffects,
    particles: ParticleSystem,
    base: AnalysisConfig,
    render: RenderConfig,
    ceiling: QualityLevel,
    quality: QualityLevel,
    governor: Option<QualityGovernor>,
    frame: AnalysisFrame,
    snapshot: TickSnapshot,
    last_timestamp_ms: Option<f64>,
}

impl<S: FrameSource> Engine<S> {
    pub fn new(mut source: S, config: EngineConfig) -> Result<Self> {
        let pipeline = AudioPipeline::new(config.analysis.clone())?;
        source.reconfigure(&config.analysis);

        let ceiling = QualityLevel::from_fft_size(config.analysis.fft_size);
        let render = config.render;
        Ok(Self {
            source,
            pipeline,
            effects: VisualEffects::default(),
            particles: ParticleSystem::new(render.max_particles, render.width, render.height, render.seed),
            base: config.analysis,
            ceiling,
            quality: ceiling,
            governor: config.budget_ms.map(|budget| QualityGovernor::new(ceiling, budget)),
            render,
            frame: AnalysisFrame::default(),
            snapshot: TickSnapshot::default(),
            last_timestamp_ms: None,
        })
    }

    /// Pulls the next frame and runs it through the whole chain.
    ///
    /// `None` once the source is exhausted. Below full quality some source
    /// frames are skipped, see [`QualityLevel::frame_stride`].
    pub fn tick(&mut self) -> Option<Result<TickSnapshot>> {
        for _ in 1..self.quality.frame_stride() {
            self.source.skip_frame()?;
        }
        let frame = self.source.next_frame()?;

        let started = Instant::now();
        let snapshot = match self.pipeline.tick(&frame.frequency, &frame.time, frame.timestamp_ms) {
            Ok(snapshot) => snapshot,
            Err(e) => return Some(Err(e)),
        };

        let dt = match self.last_timestamp_ms {
            Some(last) => ((frame.timestamp_ms - last) / 1000.0).max(0.0) as f32,
            None => 1.0 / self.render.fps.max(1) as f32,
        };
        self.last_timestamp_ms = Some(frame.timestamp_ms);
        self.effects.update(&snapshot.features, &snapshot.beat);
        self.particles.update(dt, &self.effects, &snapshot.features);
        self.frame = frame;
        self.snapshot = snapshot.clone();

        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
        log::trace!("tick {:.0}ms took {:.3}ms", self.frame.timestamp_ms, elapsed_ms);
        let change = self.governor.as_mut().and_then(|g| g.record(elapsed_ms));
        if let Some(level) = change {
            if let Err(e) = self.apply_quality(level) {
                return Some(Err(e));
            }
        }
        Some(Ok(snapshot))
    }

    /// Switches analysis resolution from the next tick on. The configured
    /// FFT size is used as-is at the top level.
    pub fn apply_quality(&mut self, level: QualityLevel) -> Result<()> {
        let config = if level >= self.ceiling {
            self.base.clone()
        } else {
            level.apply(&self.base)
        };
        self.pipeline.set_config(config.clone())?;
        self.source.reconfigure(&config);
        self.quality = level.min(self.ceiling);
        if let Some(governor) = self.governor.as_mut() {
            governor.set_level(self.quality);
        }
        Ok(())
    }

    /// Draw list for the most recent tick.
    pub fn scene(&self, mode: RenderMode) -> Scene {
        Scene::build(
            mode,
            &SceneInput {
                frequency: &self.frame.frequency,
                time: &self.frame.time,
                snapshot: &self.snapshot,
                effects: &self.effects,
                particles: &self.particles,
                scheme: self.render.color_scheme,
                width: self.render.width,
                height: self.render.height,
            },
        )
    }

    pub fn pipeline(&self) -> &AudioPipeline {
        &self.pipeline
    }

    pub fn effects(&self) -> &VisualEffects {
        &self.effects
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn quality(&self) -> QualityLevel {
        self.quality
    }

    pub fn frame_count(&self) -> Option<u64> {
        self.source.frame_count()
    }
}
