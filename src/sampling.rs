//! Geometric sampling primitives for particle placement.
//!
//! The free functions are the building blocks used by the
//! [`TargetGenerator`](crate::generator::TargetGenerator): deterministic
//! spiral placement on a cone, volumetric sphere sampling, surface-biased
//! cone sampling and stroke sampling for glyphs.
//!
//! Randomness comes from a [`SampleContext`], which wraps a small RNG seeded
//! from `(seed, stream, index)`. Every particle gets its own generator, so
//! regenerating one target array never disturbs another and the output does
//! not depend on iteration order.
//!
//! ```ignore
//! let mut ctx = SampleContext::new(seed, SampleStream::Dispersed, i, count);
//! let pos = ctx.in_sphere(25.0);
//! ```

use glam::{EulerRot, Quat, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};
use std::ops::{Add, Mul, Sub};

/// The golden angle, `π(3 − √5)` radians (≈ 137.5°).
pub const GOLDEN_ANGLE: f32 = PI * (3.0 - 2.236_068);

/// Independent random streams drawn for one particle.
///
/// Each stream is seeded separately so that, for instance, a text change
/// (which rebuilds dispersed targets) leaves assembled targets and colors
/// bit-for-bit identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStream {
    /// Assembled placement, orientation, scale and color.
    Assembled,
    /// Dispersed placement (scatter or text).
    Dispersed,
    /// Per-particle scale, shared by both arrangements.
    Scale,
    /// Per-particle animation parameters (stagger rate/delay).
    Motion,
}

impl SampleStream {
    fn salt(self) -> u64 {
        match self {
            SampleStream::Assembled => 0xA55E_3B1E_D000_0001,
            SampleStream::Dispersed => 0xD15B_E45E_D000_0002,
            SampleStream::Scale => 0x5CA1_E5EE_D000_0003,
            SampleStream::Motion => 0x3071_0A7E_D000_0004,
        }
    }
}

/// SplitMix64 finalizer, used to decorrelate neighboring particle seeds.
fn mix_seed(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Per-particle sampling context.
///
/// Holds the particle's index, the population size and a seeded RNG. Use the
/// helper methods rather than reaching for the RNG directly.
pub struct SampleContext {
    /// Index of the particle being generated (0 to count-1).
    pub index: u32,
    /// Total number of particles in the population.
    pub count: u32,
    rng: SmallRng,
}

impl SampleContext {
    /// Create a context for particle `index` of `count` on the given stream.
    pub fn new(seed: u64, stream: SampleStream, index: u32, count: u32) -> Self {
        let seed = mix_seed(seed ^ stream.salt() ^ mix_seed(index as u64));
        Self {
            index,
            count,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Normalized position of this particle in the population (0.0 to 1.0).
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.index as f32 / self.count as f32
        }
    }

    /// Random f32 in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in `[min, max)`. A degenerate range returns `min`.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random() * (max - min)
    }

    /// Random f32 in `[-half, half)`.
    #[inline]
    pub fn random_centered(&mut self, half: f32) -> f32 {
        self.random_range(-half, half)
    }

    /// Uniform point inside a sphere. See [`sample_uniform_in_sphere`].
    pub fn in_sphere(&mut self, radius: f32) -> Vec3 {
        sample_uniform_in_sphere(&mut self.rng, radius)
    }

    /// Uniform point inside an axis-aligned box. See [`sample_in_box`].
    pub fn in_box(&mut self, half_extents: Vec3) -> Vec3 {
        sample_in_box(&mut self.rng, half_extents)
    }

    /// Point just outside a cone's lateral surface. See
    /// [`sample_cone_surface_biased`].
    pub fn on_cone_surface(
        &mut self,
        height: f32,
        base_radius: f32,
        min_offset: f32,
        max_offset: f32,
    ) -> Vec3 {
        sample_cone_surface_biased(&mut self.rng, height, base_radius, min_offset, max_offset)
    }

    /// Random rotation from XYZ Euler angles, each in `[0, max)`.
    pub fn tumble(&mut self, max_angles: Vec3) -> Quat {
        let x = self.random() * max_angles.x;
        let y = self.random() * max_angles.y;
        let z = self.random() * max_angles.z;
        Quat::from_euler(EulerRot::XYZ, x, y, z)
    }
}

// ========== Pure sampling functions ==========

/// Random point uniformly distributed by volume inside a sphere.
///
/// The radius is drawn as `radius * cbrt(u)` and the direction uniformly over
/// the sphere (`phi = acos(2v - 1)`), so the radial density grows with r².
pub fn sample_uniform_in_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec3 {
    let theta = rng.gen::<f32>() * TAU;
    let cos_phi = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0);
    let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
    let r = radius * rng.gen::<f32>().cbrt();

    Vec3::new(
        r * sin_phi * theta.cos(),
        r * sin_phi * theta.sin(),
        r * cos_phi,
    )
}

/// Azimuth of spiral point `index`, in radians (unwrapped).
#[inline]
pub fn spiral_angle(index: u32) -> f32 {
    index as f32 * GOLDEN_ANGLE
}

/// Radius of a cone (apex up, centered on the origin) at height `y`.
///
/// Clamped to `[0, base_radius]` for heights outside the cone.
#[inline]
pub fn cone_radius_at(y: f32, height: f32, base_radius: f32) -> f32 {
    let progress = ((y + height / 2.0) / height).clamp(0.0, 1.0);
    base_radius * (1.0 - progress)
}

/// Place point `index` of `total` on a golden-angle spiral climbing a cone.
///
/// Height rises linearly from `-height / 2` (index 0) in steps of
/// `height / total`; the radius shrinks linearly from `base_radius` to 0 over
/// the same range. Output depends only on the arguments, so regenerating a
/// population of the same size reproduces the same layout.
pub fn sample_cone_spiral(index: u32, total: u32, height: f32, base_radius: f32) -> Vec3 {
    let progress = if total == 0 {
        0.0
    } else {
        index as f32 / total as f32
    };
    let y = -height / 2.0 + progress * height;
    let radius = base_radius * (1.0 - progress);
    let theta = spiral_angle(index);

    Vec3::new(radius * theta.cos(), y, radius * theta.sin())
}

/// Random point hugging the outside of a cone's lateral surface.
///
/// Picks a uniform height, computes the cone radius there and pushes the
/// point outward by a margin drawn from `[min_offset, max_offset)`.
pub fn sample_cone_surface_biased<R: Rng + ?Sized>(
    rng: &mut R,
    height: f32,
    base_radius: f32,
    min_offset: f32,
    max_offset: f32,
) -> Vec3 {
    let y = rng.gen::<f32>() * height - height / 2.0;
    let margin = min_offset + rng.gen::<f32>() * (max_offset - min_offset);
    let radius = cone_radius_at(y, height, base_radius) + margin;
    let theta = rng.gen::<f32>() * TAU;

    Vec3::new(radius * theta.cos(), y, radius * theta.sin())
}

/// Linear interpolation between two points.
#[inline]
pub fn sample_along_segment<T>(a: T, b: T, ratio: f32) -> T
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    a + (b - a) * ratio
}

/// Point at `ratio` (0..=1) of the arc length of a polyline.
///
/// Returns `None` for an empty polyline; a single point is returned as-is.
pub fn sample_along_polyline(points: &[Vec2], ratio: f32) -> Option<Vec2> {
    let (&first, rest) = points.split_first()?;
    let total: f32 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    if rest.is_empty() || total <= 0.0 {
        return Some(first);
    }

    let mut remaining = ratio.clamp(0.0, 1.0) * total;
    for w in points.windows(2) {
        let len = w[0].distance(w[1]);
        if remaining <= len && len > 0.0 {
            return Some(sample_along_segment(w[0], w[1], remaining / len));
        }
        remaining -= len;
    }
    points.last().copied()
}

/// Uniform point inside an axis-aligned box centered at the origin.
pub fn sample_in_box<R: Rng + ?Sized>(rng: &mut R, half_extents: Vec3) -> Vec3 {
    Vec3::new(
        (rng.gen::<f32>() * 2.0 - 1.0) * half_extents.x,
        (rng.gen::<f32>() * 2.0 - 1.0) * half_extents.y,
        (rng.gen::<f32>() * 2.0 - 1.0) * half_extents.z,
    )
}
