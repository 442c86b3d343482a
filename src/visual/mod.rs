pub mod effects;
pub mod palette;
pub mod particles;
pub mod scene;

pub use effects::VisualEffects;
pub use palette::{ColorScheme, Rgba};
pub use particles::{Particle, ParticleKind, ParticleSystem};
pub use scene::{Primitive, PrimitiveCounts, RenderMode, Scene, SceneInput};
