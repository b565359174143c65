//! # Arbor - Particle Morphing Engine
//!
//! Thousands of instanced particles that morph between two arrangements: an
//! *assembled* cone-shaped tree made of needles and ornaments, and a
//! *dispersed* form that is either a random cloud or a point cloud spelling
//! out text.
//!
//! Arbor computes deterministic targets for both arrangements, interpolates
//! every particle toward the active one each frame, and encodes the result
//! into `bytemuck`-ready instance buffers. Windowing, cameras and shading are
//! left to the host.
//!
//! ## Quick Start
//!
//! ```ignore
//! use arbor::prelude::*;
//!
//! let mut scene = MorphScene::new(MorphConfig::default())?;
//!
//! // on click
//! scene.toggle();
//!
//! // every frame
//! scene.tick(dt);
//! for population in scene.populations_mut() {
//!     population.upload(&mut sink);
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Targets
//!
//! Each particle has two precomputed [`Transform`]s, one per [`TargetState`],
//! built by the [`TargetGenerator`] from a [`ShapePolicy`]. Assembled targets
//! depend only on the particle count, the tree dimensions and the seed; text
//! targets are rebuilt when the display text changes.
//!
//! ### Morphing
//!
//! The [`MorphController`] moves live transforms toward the active targets
//! with either exponential easing or a staggered tween (see [`Easing`]). The
//! logical state flips instantly; [`MorphScene::is_fully_assembled`] reports
//! when the visual transition has finished.
//!
//! ### Instances
//!
//! Slot `i` of every [`InstanceBuffer`] always belongs to particle `i`.
//! Dirty data is pushed through an [`InstanceSink`]; with the `gpu` feature,
//! [`gpu::GpuInstanceBuffers`] provides a `wgpu` implementation.
//!
//! ## Configuration
//!
//! | Preset | Populations | Dispersed form |
//! |--------|-------------|----------------|
//! | [`MorphConfig::default`] | needles + ornaments | random scatter |
//! | [`MorphConfig::greeting`] | sparkles | greeting text |
//!
//! Configurations round-trip through JSON with [`MorphConfig::save`] and
//! [`MorphConfig::load`].

pub mod config;
pub mod error;
pub mod generator;
pub mod glyph;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod instance;
pub mod morph;
pub mod palette;
pub mod population;
pub mod sampling;
pub mod scene;

pub use bytemuck;
pub use config::{MorphConfig, MotionConfig, PopulationConfig, ScatterConfig, TextConfig, TreeConfig};
pub use error::{ArborError, Result};
pub use generator::{
    AssembledTargets, DispersedMode, Orientation, Placement, PopulationKind, ScaleRule, ShapePolicy,
    TargetGenerator, Transform,
};
pub use glam::{Mat4, Quat, Vec2, Vec3};
pub use instance::{InstanceBuffer, InstanceColor, InstanceSink, InstanceTransform};
pub use morph::{Ease, Easing, FrameStats, GroupSpin, MorphController, TargetState};
pub use palette::Palette;
pub use population::{Particle, Population};
pub use sampling::SampleContext;
pub use scene::MorphScene;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use arbor::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{MorphConfig, MotionConfig, PopulationConfig, TextConfig, TreeConfig};
    pub use crate::error::{ArborError, Result};
    pub use crate::generator::{DispersedMode, PopulationKind, ShapePolicy, Transform};
    #[cfg(feature = "gpu")]
    pub use crate::gpu::{GpuInstanceBuffers, GpuUploader};
    pub use crate::instance::{InstanceBuffer, InstanceColor, InstanceSink, InstanceTransform};
    pub use crate::morph::{Ease, Easing, FrameStats, TargetState};
    pub use crate::palette::Palette;
    pub use crate::population::Population;
    pub use crate::scene::MorphScene;
    pub use crate::{Mat4, Quat, Vec2, Vec3};
}
