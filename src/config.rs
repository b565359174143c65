//! Configuration types for Arbor scenes.
//!
//! A [`MorphConfig`] describes a complete deployment: the tree shape, the
//! scatter and text layouts, the motion tuning and the list of particle
//! populations. Configurations can be serialized to JSON and loaded back.
//!
//! Every numeric knob is checked by [`MorphConfig::validate`] ("positive,
//! finite"); building a scene from an invalid configuration fails before any
//! target is generated.
//!
//! # Presets
//!
//! | Preset | Populations | Dispersed form |
//! |--------|-------------|----------------|
//! | [`MorphConfig::default`] | 1800 needles + 150 ornaments | random scatter |
//! | [`MorphConfig::greeting`] | 12 000 sparkles | greeting text |

use crate::error::{ensure_non_negative, ensure_positive, ArborError, Result};
use crate::generator::{DispersedMode, PopulationKind, ShapePolicy};
use crate::morph::{Ease, Easing, TargetState};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Dimensions of the assembled cone, centered on the origin, apex up.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TreeConfig {
    /// Total height; the cone spans `-height / 2..height / 2`.
    pub height: f32,
    /// Radius at the base.
    pub base_radius: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            height: 12.0,
            base_radius: 4.5,
        }
    }
}

/// Random scatter cloud used by [`DispersedMode::Scatter`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScatterConfig {
    /// Radius of the scatter sphere before the per-policy factor.
    pub radius: f32,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self { radius: 25.0 }
    }
}

/// Text layout used by [`DispersedMode::Text`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    /// Horizontal advance per character, in glyph units.
    pub slot_width: f32,
    /// Glyph units to world units.
    pub scale: f32,
    /// Points sampled per stroke, minus one (both endpoints are included).
    pub samples_per_stroke: u32,
    /// Full width of the random depth band around `z = 0`.
    pub depth_jitter: f32,
    /// Center the string horizontally on the origin.
    pub centered: bool,
    /// Half extents of the box used for particles left over after the text.
    pub fill_half_extents: Vec3,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            slot_width: 10.0,
            scale: 1.2,
            samples_per_stroke: 20,
            depth_jitter: 3.0,
            centered: true,
            fill_half_extents: Vec3::new(40.0, 15.0, 10.0),
        }
    }
}

impl TextConfig {
    /// Compose the greeting line shown for `name`.
    pub fn greeting(name: &str) -> String {
        let name = name.trim();
        if name.is_empty() {
            "MERRY CHRISTMAS".to_string()
        } else {
            format!("MERRY CHRISTMAS {}", name.to_uppercase())
        }
    }
}

/// Interpolation and idle-motion tuning for the morph controller.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    /// How live transforms approach their targets.
    pub easing: Easing,
    /// Per-particle stagger: rate spread for exponential easing, maximum
    /// start delay in seconds for tweens.
    pub stagger: f32,
    /// Group yaw speed while assembled, radians per second.
    pub group_spin_rate: f32,
    /// Fraction of group yaw kept per 1/60 s while dispersed.
    pub group_spin_decay: f32,
    /// Vertical bob amplitude while dispersed.
    pub bob_amplitude: f32,
    /// Vertical bob angular frequency, radians per second.
    pub bob_frequency: f32,
    /// Per-particle yaw speed while dispersed, radians per second.
    pub particle_spin_rate: f32,
    /// Spreads spin speeds across particle ids: particle `id` spins at
    /// `1 + frac(id * phase / 2π)` times the base rate.
    pub particle_spin_phase: f32,
    /// Distance under which a particle snaps onto its target.
    pub settle_epsilon: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            easing: Easing::Exponential { speed: 2.5 },
            stagger: 0.5,
            group_spin_rate: 0.1,
            group_spin_decay: 0.95,
            bob_amplitude: 0.15,
            bob_frequency: 1.0,
            particle_spin_rate: 0.0,
            particle_spin_phase: 0.05,
            settle_epsilon: 1e-4,
        }
    }
}

/// One particle population in a scene.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PopulationConfig {
    /// Which built-in shape policy to use.
    pub kind: PopulationKind,
    /// Number of particles; fixed for the population's lifetime.
    pub count: u32,
    /// What the dispersed arrangement looks like.
    #[serde(default)]
    pub dispersed: DispersedMode,
    /// Replaces the kind's built-in policy when set.
    #[serde(default)]
    pub policy: Option<ShapePolicy>,
}

impl PopulationConfig {
    /// A population of `count` particles of `kind`, scattered when dispersed.
    pub fn new(kind: PopulationKind, count: u32) -> Self {
        Self {
            kind,
            count,
            dispersed: DispersedMode::Scatter,
            policy: None,
        }
    }

    /// Set the dispersed mode.
    pub fn with_dispersed(mut self, mode: DispersedMode) -> Self {
        self.dispersed = mode;
        self
    }

    /// Override the kind's built-in shape policy.
    pub fn with_policy(mut self, policy: ShapePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// The effective shape policy.
    pub fn shape_policy(&self) -> ShapePolicy {
        self.policy.clone().unwrap_or_else(|| self.kind.policy())
    }
}

/// Complete scene configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MorphConfig {
    /// Root seed for every random choice made during generation.
    pub seed: u64,
    /// Arrangement shown (already settled) when the scene is built.
    pub initial_state: TargetState,
    /// Text spelled by text-dispersed populations.
    pub display_text: String,
    pub tree: TreeConfig,
    pub scatter: ScatterConfig,
    pub text: TextConfig,
    pub motion: MotionConfig,
    pub populations: Vec<PopulationConfig>,
}

impl Default for MorphConfig {
    fn default() -> Self {
        Self {
            seed: 0x7EE5_2025,
            initial_state: TargetState::Assembled,
            display_text: String::new(),
            tree: TreeConfig::default(),
            scatter: ScatterConfig::default(),
            text: TextConfig::default(),
            motion: MotionConfig::default(),
            populations: vec![
                PopulationConfig::new(PopulationKind::Needle, 1800),
                PopulationConfig::new(PopulationKind::Ornament, 150),
            ],
        }
    }
}

impl MorphConfig {
    /// Text-forming deployment: one dense sparkle population that spells a
    /// greeting when dispersed.
    pub fn greeting() -> Self {
        Self {
            display_text: TextConfig::greeting(""),
            tree: TreeConfig {
                height: 10.0,
                base_radius: 4.5,
            },
            motion: MotionConfig {
                easing: Easing::Tween {
                    duration: 4.0,
                    ease: Ease::QuartInOut,
                },
                stagger: 0.8,
                bob_amplitude: 0.3,
                particle_spin_rate: 0.3,
                ..MotionConfig::default()
            },
            populations: vec![PopulationConfig::new(PopulationKind::Sparkle, 12_000)
                .with_dispersed(DispersedMode::Text)],
            ..Self::default()
        }
    }

    /// Check that every numeric option is finite and in range.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("tree.height", self.tree.height)?;
        ensure_positive("tree.base_radius", self.tree.base_radius)?;
        ensure_positive("scatter.radius", self.scatter.radius)?;

        ensure_positive("text.slot_width", self.text.slot_width)?;
        ensure_positive("text.scale", self.text.scale)?;
        ensure_non_negative("text.depth_jitter", self.text.depth_jitter)?;
        ensure_non_negative("text.fill_half_extents.x", self.text.fill_half_extents.x)?;
        ensure_non_negative("text.fill_half_extents.y", self.text.fill_half_extents.y)?;
        ensure_non_negative("text.fill_half_extents.z", self.text.fill_half_extents.z)?;

        self.motion.validate()?;

        for population in &self.populations {
            population.shape_policy().validate()?;
        }
        Ok(())
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and validate a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl MotionConfig {
    /// Check the motion knobs.
    pub fn validate(&self) -> Result<()> {
        match self.easing {
            Easing::Exponential { speed } => ensure_positive("motion.easing.speed", speed)?,
            Easing::Tween { duration, .. } => ensure_positive("motion.easing.duration", duration)?,
        }
        ensure_non_negative("motion.stagger", self.stagger)?;
        ensure_non_negative("motion.group_spin_rate", self.group_spin_rate)?;
        ensure_positive("motion.group_spin_decay", self.group_spin_decay)?;
        if self.group_spin_decay > 1.0 {
            return Err(ArborError::InvalidParameter {
                name: "motion.group_spin_decay",
                value: self.group_spin_decay,
            });
        }
        ensure_non_negative("motion.bob_amplitude", self.bob_amplitude)?;
        ensure_non_negative("motion.bob_frequency", self.bob_frequency)?;
        ensure_non_negative("motion.particle_spin_rate", self.particle_spin_rate)?;
        ensure_non_negative("motion.particle_spin_phase", self.particle_spin_phase)?;
        ensure_positive("motion.settle_epsilon", self.settle_epsilon)?;
        Ok(())
    }
}
