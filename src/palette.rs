//! Color palettes and color-space helpers.
//!
//! Each population draws its per-particle base color from a small weighted
//! [`Palette`], then bakes in a slight HSL offset for organic variation.
//!
//! ```ignore
//! let base = Palette::Emerald.pick(ctx.random());
//! let color = offset_hsl(base, 0.0, 0.0, ctx.random_centered(0.05));
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// RGB color from a `0xRRGGBB` literal, channels in 0.0-1.0.
pub fn rgb_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    )
}

pub const EMERALD_DEEP: u32 = 0x002419;
pub const EMERALD_LIGHT: u32 = 0x004d33;
pub const EMERALD_GLOW: u32 = 0x004d20;
pub const GOLD_METALLIC: u32 = 0xFFD700;
pub const GOLD_ROSE: u32 = 0xE6BE8A;
pub const GLOW_WARM: u32 = 0xFFAA33;

/// Weighted base colors for a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Palette {
    /// Deep and light emerald, evenly mixed (needles).
    #[default]
    Emerald,

    /// Mostly metallic gold with some rose gold (ornaments).
    Gold,

    /// Emerald glow with warm highlights (text sparkles).
    Sparkle,
}

impl Palette {
    /// Color stops as `0xRRGGBB` and their relative weights.
    pub fn entries(&self) -> &'static [(u32, f32)] {
        match self {
            Palette::Emerald => &[(EMERALD_DEEP, 0.5), (EMERALD_LIGHT, 0.5)],
            Palette::Gold => &[(GOLD_METALLIC, 0.7), (GOLD_ROSE, 0.3)],
            Palette::Sparkle => &[(EMERALD_GLOW, 0.8), (GLOW_WARM, 0.2)],
        }
    }

    /// Pick an entry using a uniform roll in `[0, 1)`.
    pub fn pick(&self, roll: f32) -> Vec3 {
        let entries = self.entries();
        let total: f32 = entries.iter().map(|(_, w)| w).sum();
        let mut acc = 0.0;
        for &(hex, weight) in entries {
            acc += weight / total;
            if roll < acc {
                return rgb_hex(hex);
            }
        }
        rgb_hex(entries[entries.len() - 1].0)
    }
}

/// Convert RGB (0-1) to HSL (each 0-1).
pub fn rgb_to_hsl(rgb: Vec3) -> Vec3 {
    let max = rgb.max_element();
    let min = rgb.min_element();
    let lightness = (min + max) / 2.0;

    if max == min {
        return Vec3::new(0.0, 0.0, lightness);
    }

    let delta = max - min;
    let saturation = if lightness <= 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };
    let hue = if max == rgb.x {
        (rgb.y - rgb.z) / delta + if rgb.y < rgb.z { 6.0 } else { 0.0 }
    } else if max == rgb.y {
        (rgb.z - rgb.x) / delta + 2.0
    } else {
        (rgb.x - rgb.y) / delta + 4.0
    };

    Vec3::new(hue / 6.0, saturation, lightness)
}

/// Convert HSL (each 0-1) to RGB.
pub fn hsl_to_rgb(hsl: Vec3) -> Vec3 {
    let (h, s, l) = (hsl.x.rem_euclid(1.0), hsl.y.clamp(0.0, 1.0), hsl.z.clamp(0.0, 1.0));
    if s == 0.0 {
        return Vec3::splat(l);
    }

    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    Vec3::new(
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Shift a color in HSL space. Hue wraps; saturation and lightness clamp.
pub fn offset_hsl(rgb: Vec3, dh: f32, ds: f32, dl: f32) -> Vec3 {
    let hsl = rgb_to_hsl(rgb);
    hsl_to_rgb(Vec3::new(hsl.x + dh, hsl.y + ds, hsl.z + dl))
}
