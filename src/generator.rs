//! Target generation for the assembled and dispersed arrangements.
//!
//! A [`TargetGenerator`] turns a particle count and a [`ShapePolicy`] into two
//! index-aligned arrays of [`Transform`]s, one per arrangement, plus one baked
//! color per particle. Needles, ornaments and text sparkles all go through
//! the same code path; only the policy differs.
//!
//! # Determinism
//!
//! All randomness flows from the generator's seed through per-particle
//! [`SampleContext`]s, so the same inputs always produce the same targets.
//! Assembled targets and colors never depend on the display text: changing
//! the text only rebuilds the dispersed array.
//!
//! # Example
//!
//! ```ignore
//! let generator = TargetGenerator::new(&config)?;
//! let policy = PopulationKind::Needle.policy();
//! let assembled = generator.build_assembled_targets(1800, &policy)?;
//! let dispersed =
//!     generator.build_dispersed_targets(1800, &policy, DispersedMode::Scatter, None)?;
//! ```

use crate::config::{MorphConfig, ScatterConfig, TextConfig, TreeConfig};
use crate::error::{ensure_non_negative, ensure_positive, Result};
use crate::glyph::{is_supported, layout_glyph_points};
use crate::palette::{offset_hsl, Palette};
use crate::sampling::{sample_cone_spiral, SampleContext, SampleStream};
use glam::{EulerRot, Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

/// Position, orientation and scale of one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Build from XYZ Euler angles (radians).
    pub fn from_euler(position: Vec3, euler: Vec3, scale: Vec3) -> Self {
        Self::new(
            position,
            Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z),
            scale,
        )
    }

    /// `true` when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    /// Move toward `target` by factor `t`: lerp position and scale, slerp
    /// rotation. `t` outside `(0, 1)` returns an endpoint exactly.
    pub fn interpolate(&self, target: &Transform, t: f32) -> Transform {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *target;
        }
        Transform {
            position: self.position.lerp(target.position, t),
            rotation: self.rotation.slerp(target.rotation, t).normalize(),
            scale: self.scale.lerp(target.scale, t),
        }
    }

    /// Whether `self` is within `epsilon` of `other` in every component.
    ///
    /// Rotations compare component-wise up to sign, so `q` and `-q` match.
    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        let (a, b) = (Vec4::from(self.rotation), Vec4::from(other.rotation));
        self.position.distance(other.position) <= epsilon
            && self.scale.distance(other.scale) <= epsilon
            && a.distance(b).min(a.distance(-b)) <= epsilon
    }

    /// Column-major model matrix (scale, then rotate, then translate).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Where assembled particles sit on the cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Placement {
    /// Golden-angle spiral over the cone, densely packed.
    Spiral,
    /// Random points just outside the lateral surface.
    SurfaceBiased { min_offset: f32, max_offset: f32 },
}

/// How assembled particles are oriented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Orientation {
    /// Face outward from the trunk and tilt upward. Euler XYZ:
    /// `(±wobble, -azimuth, tilt + [0, tilt_jitter))`.
    Outward {
        wobble: f32,
        tilt: f32,
        tilt_jitter: f32,
    },
    /// Fixed Euler XYZ angles plus `[0, jitter)` per axis.
    Fixed { euler: Vec3, jitter: Vec3 },
}

/// Assembled scale rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScaleRule {
    /// `base` with its Y axis shrunk by `taper * progress` toward the apex.
    Tapered { base: Vec3, taper: f32 },
    /// Uniform scale drawn from `[min, max)`.
    Uniform { min: f32, max: f32 },
}

/// What the dispersed arrangement of a population looks like.
///
/// Chosen once per population; a deployment never switches silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispersedMode {
    /// Independent uniform samples inside the scatter sphere.
    #[default]
    Scatter,
    /// Points spelling the display text; leftovers scatter in a box.
    Text,
}

/// Built-in population kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationKind {
    /// Thin emerald needles forming the body of the tree.
    Needle,
    /// Gold spheres hanging off the surface.
    Ornament,
    /// Small glowing particles for the text-forming deployment.
    Sparkle,
}

impl PopulationKind {
    /// The built-in shape policy for this kind.
    pub fn policy(self) -> ShapePolicy {
        match self {
            PopulationKind::Needle => ShapePolicy {
                placement: Placement::Spiral,
                orientation: Orientation::Outward {
                    wobble: 0.25,
                    tilt: FRAC_PI_4,
                    tilt_jitter: 0.2,
                },
                scale: ScaleRule::Tapered {
                    base: Vec3::new(0.1, 0.8, 0.1),
                    taper: 0.5,
                },
                dispersed_scale: Some(Vec3::new(0.1, 0.5, 0.1)),
                palette: Palette::Emerald,
                lightness_jitter: 0.05,
                scatter_radius_factor: 1.0,
                tumble: Vec3::splat(PI),
            },
            PopulationKind::Ornament => ShapePolicy {
                placement: Placement::SurfaceBiased {
                    min_offset: 0.2,
                    max_offset: 0.5,
                },
                orientation: Orientation::Fixed {
                    euler: Vec3::ZERO,
                    jitter: Vec3::ZERO,
                },
                scale: ScaleRule::Uniform {
                    min: 0.25,
                    max: 0.5,
                },
                dispersed_scale: None,
                palette: Palette::Gold,
                lightness_jitter: 0.0,
                scatter_radius_factor: 1.2,
                tumble: Vec3::new(PI, PI, 0.0),
            },
            PopulationKind::Sparkle => ShapePolicy {
                placement: Placement::SurfaceBiased {
                    min_offset: 0.0,
                    max_offset: 0.0,
                },
                orientation: Orientation::Fixed {
                    euler: Vec3::new(FRAC_PI_2, 0.0, 0.0),
                    jitter: Vec3::new(0.5, TAU, 0.0),
                },
                scale: ScaleRule::Uniform {
                    min: 0.18,
                    max: 0.18,
                },
                dispersed_scale: None,
                palette: Palette::Sparkle,
                lightness_jitter: 0.05,
                scatter_radius_factor: 1.0,
                tumble: Vec3::new(0.5, TAU, 0.0),
            },
        }
    }
}

/// Everything that distinguishes one population's targets from another's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePolicy {
    pub placement: Placement,
    pub orientation: Orientation,
    pub scale: ScaleRule,
    /// Dispersed scale; `None` keeps the assembled scale.
    pub dispersed_scale: Option<Vec3>,
    pub palette: Palette,
    /// Half-range of the random lightness offset baked into each color.
    pub lightness_jitter: f32,
    /// Multiplier on the scene's scatter radius.
    pub scatter_radius_factor: f32,
    /// Maximum random Euler angles for dispersed orientations.
    pub tumble: Vec3,
}

impl ShapePolicy {
    /// Check the policy's numeric values.
    pub fn validate(&self) -> Result<()> {
        if let Placement::SurfaceBiased {
            min_offset,
            max_offset,
        } = self.placement
        {
            ensure_non_negative("policy.placement.min_offset", min_offset)?;
            ensure_non_negative("policy.placement.max_offset", max_offset)?;
            ensure_non_negative("policy.placement.offset_range", max_offset - min_offset)?;
        }
        match self.orientation {
            Orientation::Outward {
                wobble,
                tilt,
                tilt_jitter,
            } => {
                ensure_non_negative("policy.orientation.wobble", wobble)?;
                ensure_non_negative("policy.orientation.tilt", tilt)?;
                ensure_non_negative("policy.orientation.tilt_jitter", tilt_jitter)?;
            }
            Orientation::Fixed { euler, jitter } => {
                for v in euler.to_array() {
                    ensure_non_negative("policy.orientation.euler", v.abs())?;
                }
                for v in jitter.to_array() {
                    ensure_non_negative("policy.orientation.jitter", v)?;
                }
            }
        }
        match self.scale {
            ScaleRule::Tapered { base, taper } => {
                for v in base.to_array() {
                    ensure_positive("policy.scale.base", v)?;
                }
                ensure_non_negative("policy.scale.taper", taper)?;
            }
            ScaleRule::Uniform { min, max } => {
                ensure_positive("policy.scale.min", min)?;
                ensure_positive("policy.scale.max", max)?;
                ensure_non_negative("policy.scale.range", max - min)?;
            }
        }
        if let Some(scale) = self.dispersed_scale {
            for v in scale.to_array() {
                ensure_positive("policy.dispersed_scale", v)?;
            }
        }
        ensure_non_negative("policy.lightness_jitter", self.lightness_jitter)?;
        ensure_positive("policy.scatter_radius_factor", self.scatter_radius_factor)?;
        for v in self.tumble.to_array() {
            ensure_non_negative("policy.tumble", v)?;
        }
        Ok(())
    }

    /// Scale shared by both arrangements for particle `index` at `progress`.
    fn base_scale(&self, seed: u64, index: u32, count: u32, progress: f32) -> Vec3 {
        match self.scale {
            ScaleRule::Tapered { base, taper } => {
                base * Vec3::new(1.0, 1.0 - progress * taper, 1.0)
            }
            ScaleRule::Uniform { min, max } => {
                let mut ctx = SampleContext::new(seed, SampleStream::Scale, index, count);
                Vec3::splat(ctx.random_range(min, max))
            }
        }
    }
}

/// Assembled targets and the colors baked alongside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledTargets {
    pub transforms: Vec<Transform>,
    pub colors: Vec<Vec3>,
}

/// Builds target arrays from validated scene configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGenerator {
    tree: TreeConfig,
    scatter: ScatterConfig,
    text: TextConfig,
    seed: u64,
}

impl TargetGenerator {
    /// Create a generator from a scene configuration.
    ///
    /// Fails if any shape parameter is non-finite or out of range.
    pub fn new(config: &MorphConfig) -> Result<Self> {
        Self::from_parts(config.tree, config.scatter, config.text.clone(), config.seed)
    }

    /// Create a generator from individual settings.
    pub fn from_parts(
        tree: TreeConfig,
        scatter: ScatterConfig,
        text: TextConfig,
        seed: u64,
    ) -> Result<Self> {
        ensure_positive("tree.height", tree.height)?;
        ensure_positive("tree.base_radius", tree.base_radius)?;
        ensure_positive("scatter.radius", scatter.radius)?;
        ensure_positive("text.slot_width", text.slot_width)?;
        ensure_positive("text.scale", text.scale)?;
        ensure_non_negative("text.depth_jitter", text.depth_jitter)?;
        for v in text.fill_half_extents.to_array() {
            ensure_non_negative("text.fill_half_extents", v)?;
        }
        Ok(Self {
            tree,
            scatter,
            text,
            seed,
        })
    }

    /// A copy of this generator with its seed re-keyed by `salt`, so that
    /// several populations built from one scene seed do not share samples.
    pub fn with_salt(&self, salt: u64) -> Self {
        Self {
            seed: self.seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17),
            ..self.clone()
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tree(&self) -> &TreeConfig {
        &self.tree
    }

    pub fn text(&self) -> &TextConfig {
        &self.text
    }

    /// Build the assembled (tree) transform and color for every particle.
    ///
    /// Depends only on `count`, the policy, the tree dimensions and the seed.
    pub fn build_assembled_targets(
        &self,
        count: u32,
        policy: &ShapePolicy,
    ) -> Result<AssembledTargets> {
        policy.validate()?;
        let TreeConfig {
            height,
            base_radius,
        } = self.tree;

        let mut transforms = Vec::with_capacity(count as usize);
        let mut colors = Vec::with_capacity(count as usize);

        for i in 0..count {
            let mut ctx = SampleContext::new(self.seed, SampleStream::Assembled, i, count);

            let (position, progress) = match policy.placement {
                Placement::Spiral => (
                    sample_cone_spiral(i, count, height, base_radius),
                    ctx.progress(),
                ),
                Placement::SurfaceBiased {
                    min_offset,
                    max_offset,
                } => {
                    let p = ctx.on_cone_surface(height, base_radius, min_offset, max_offset);
                    (p, ((p.y + height / 2.0) / height).clamp(0.0, 1.0))
                }
            };

            let euler = match policy.orientation {
                Orientation::Outward {
                    wobble,
                    tilt,
                    tilt_jitter,
                } => {
                    let azimuth = position.z.atan2(position.x);
                    Vec3::new(
                        ctx.random_centered(wobble),
                        -azimuth,
                        tilt + ctx.random() * tilt_jitter,
                    )
                }
                Orientation::Fixed { euler, jitter } => {
                    euler
                        + Vec3::new(
                            ctx.random() * jitter.x,
                            ctx.random() * jitter.y,
                            ctx.random() * jitter.z,
                        )
                }
            };

            let scale = policy.base_scale(self.seed, i, count, progress);

            let base = policy.palette.pick(ctx.random());
            let color = if policy.lightness_jitter > 0.0 {
                offset_hsl(base, 0.0, 0.0, ctx.random_centered(policy.lightness_jitter))
            } else {
                base
            };

            transforms.push(Transform::from_euler(position, euler, scale));
            colors.push(color);
        }

        log::debug!(
            "Built {} assembled targets ({:?} placement)",
            count,
            policy.placement
        );
        Ok(AssembledTargets { transforms, colors })
    }

    /// Build the dispersed transform for every particle.
    ///
    /// `Scatter` ignores `text`. `Text` spells `text` (or nothing, if `None`)
    /// and scatters every particle beyond the glyph points in the fill box.
    pub fn build_dispersed_targets(
        &self,
        count: u32,
        policy: &ShapePolicy,
        mode: DispersedMode,
        text: Option<&str>,
    ) -> Result<Vec<Transform>> {
        policy.validate()?;

        let glyph_points = match mode {
            DispersedMode::Scatter => Vec::new(),
            DispersedMode::Text => {
                let text = text.unwrap_or("");
                let missing = text
                    .chars()
                    .filter(|ch| !ch.is_whitespace() && !is_supported(ch.to_ascii_uppercase()))
                    .count();
                if missing > 0 {
                    log::debug!(
                        "{} characters of {:?} have no glyph; leaving their slots blank",
                        missing,
                        text
                    );
                }
                layout_glyph_points(text, &self.text, count as usize)
            }
        };
        let scatter_radius = self.scatter.radius * policy.scatter_radius_factor;
        let depth_half = self.text.depth_jitter / 2.0;

        let transforms = (0..count)
            .map(|i| {
                let mut ctx = SampleContext::new(self.seed, SampleStream::Dispersed, i, count);
                let position = match mode {
                    DispersedMode::Scatter => ctx.in_sphere(scatter_radius),
                    DispersedMode::Text => match glyph_points.get(i as usize) {
                        Some(&p) => p + Vec3::Z * ctx.random_centered(depth_half),
                        None => ctx.in_box(self.text.fill_half_extents),
                    },
                };
                let rotation = ctx.tumble(policy.tumble);
                let scale = policy
                    .dispersed_scale
                    .unwrap_or_else(|| policy.base_scale(self.seed, i, count, ctx.progress()));
                Transform::new(position, rotation, scale)
            })
            .collect();

        log::debug!(
            "Built {} dispersed targets ({:?}, {} glyph points)",
            count,
            mode,
            glyph_points.len()
        );
        Ok(transforms)
    }
}
