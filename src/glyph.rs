//! Block-letter glyph table and text layout.
//!
//! Supported letters are drawn as a few straight polylines in a letter-local
//! frame: origin at the bottom-left, [`GLYPH_WIDTH`] units wide and
//! [`GLYPH_HEIGHT`] units tall. Anything else (space included) has no strokes
//! but still takes up one slot.
//!
//! | Letters |
//! |---------|
//! | `A C E H I M R S T Y` |

use crate::config::TextConfig;
use crate::sampling::sample_along_polyline;
use glam::{Vec2, Vec3};

/// Width of every glyph in letter-local units.
pub const GLYPH_WIDTH: f32 = 3.0;

/// Height of every glyph in letter-local units.
pub const GLYPH_HEIGHT: f32 = 8.0;

/// One polyline of a glyph, as `[x, y]` points.
pub type Stroke = &'static [[f32; 2]];

const A: &[Stroke] = &[
    &[[0.0, 0.0], [1.5, 8.0], [3.0, 0.0]],
    &[[0.0, 4.0], [3.0, 4.0]],
];
const C: &[Stroke] = &[&[
    [3.0, 8.0],
    [1.0, 8.0],
    [0.0, 7.0],
    [0.0, 1.0],
    [1.0, 0.0],
    [3.0, 0.0],
]];
const E: &[Stroke] = &[
    &[[3.0, 0.0], [0.0, 0.0], [0.0, 8.0], [3.0, 8.0]],
    &[[0.0, 4.0], [2.5, 4.0]],
];
const H: &[Stroke] = &[
    &[[0.0, 0.0], [0.0, 8.0]],
    &[[0.0, 4.0], [3.0, 4.0]],
    &[[3.0, 0.0], [3.0, 8.0]],
];
const I: &[Stroke] = &[
    &[[0.0, 8.0], [3.0, 8.0]],
    &[[1.5, 8.0], [1.5, 0.0]],
    &[[0.0, 0.0], [3.0, 0.0]],
];
const M: &[Stroke] = &[
    &[[0.0, 0.0], [0.0, 6.0], [1.5, 8.0], [3.0, 6.0], [3.0, 0.0]],
    &[[1.5, 4.0], [1.5, 8.0]],
];
const R: &[Stroke] = &[
    &[[0.0, 0.0], [0.0, 8.0], [2.0, 8.0], [3.0, 6.0], [2.5, 4.0], [3.0, 2.0]],
    &[[1.5, 4.0], [3.0, 4.0]],
];
const S: &[Stroke] = &[&[
    [0.0, 8.0],
    [1.0, 8.0],
    [3.0, 6.0],
    [2.0, 4.0],
    [3.0, 2.0],
    [1.0, 0.0],
    [0.0, 0.0],
]];
const T: &[Stroke] = &[&[[0.0, 8.0], [3.0, 8.0]], &[[1.5, 8.0], [1.5, 0.0]]];
const Y: &[Stroke] = &[
    &[[0.0, 8.0], [1.5, 4.0], [3.0, 8.0]],
    &[[1.5, 4.0], [1.5, 0.0]],
];

/// Strokes for an uppercase letter; empty for anything unsupported.
pub fn glyph_strokes(ch: char) -> &'static [Stroke] {
    match ch {
        'A' => A,
        'C' => C,
        'E' => E,
        'H' => H,
        'I' => I,
        'M' => M,
        'R' => R,
        'S' => S,
        'T' => T,
        'Y' => Y,
        _ => &[],
    }
}

/// Whether `ch` has strokes in the table.
pub fn is_supported(ch: char) -> bool {
    !glyph_strokes(ch).is_empty()
}

/// Number of stroke points `text` would produce with unlimited capacity.
pub fn glyph_point_count(text: &str, samples_per_stroke: u32) -> usize {
    text.chars()
        .map(|ch| glyph_strokes(ch.to_ascii_uppercase()).len())
        .sum::<usize>()
        * (samples_per_stroke as usize + 1)
}

/// Lay `text` out and sample its strokes into world-space points.
///
/// Characters are uppercased, then walked left to right; the cursor advances
/// by `slot_width` after every character whether it has strokes or not. Each
/// stroke yields `samples_per_stroke + 1` points spaced evenly by arc length.
/// Points are placed on `z = 0` (depth jitter is the caller's business) and at
/// most `capacity` points are produced.
pub fn layout_glyph_points(text: &str, config: &TextConfig, capacity: usize) -> Vec<Vec3> {
    let chars: Vec<char> = text.chars().map(|c| c.to_ascii_uppercase()).collect();
    let scale = config.scale;
    let origin_x = match chars.len() {
        n if config.centered && n > 0 => {
            -((n - 1) as f32 * config.slot_width + GLYPH_WIDTH) * scale / 2.0
        }
        _ => 0.0,
    };
    let origin_y = -GLYPH_HEIGHT * scale / 2.0;
    let samples = config.samples_per_stroke;

    let expected = glyph_point_count(text, samples).min(capacity);
    let mut points = Vec::with_capacity(expected);
    let mut cursor = 0.0;

    'text: for ch in chars {
        for stroke in glyph_strokes(ch) {
            let stroke: Vec<Vec2> = stroke.iter().map(|&p| Vec2::from(p)).collect();
            for t in 0..=samples {
                if points.len() >= capacity {
                    break 'text;
                }
                let ratio = if samples == 0 {
                    0.0
                } else {
                    t as f32 / samples as f32
                };
                if let Some(local) = sample_along_polyline(&stroke, ratio) {
                    points.push(Vec3::new(
                        (cursor + local.x) * scale + origin_x,
                        local.y * scale + origin_y,
                        0.0,
                    ));
                }
            }
        }
        cursor += config.slot_width;
    }

    points
}
