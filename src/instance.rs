//! Instance buffer encoding for bulk (instanced) rendering.
//!
//! Each population owns one [`InstanceBuffer`]: a positional array of
//! [`InstanceTransform`]s and [`InstanceColor`]s where slot `i` always
//! belongs to particle `i`. The morph controller rewrites every transform
//! slot once per frame and marks the buffer dirty; the host drains dirty data
//! into its renderer through an [`InstanceSink`].
//!
//! Both record types are `#[repr(C)]` and [`bytemuck::Pod`], so the slices
//! can be handed to a GPU API as raw bytes.
//!
//! ```ignore
//! population.tick(dt);
//! population.upload(&mut my_sink); // no-op if nothing changed
//! ```

use crate::generator::Transform;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-instance model matrix, column-major.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub model: [[f32; 4]; 4],
}

impl InstanceTransform {
    pub const IDENTITY: Self = Self {
        model: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            model: matrix.to_cols_array_2d(),
        }
    }

    pub fn from_transform(transform: &Transform) -> Self {
        Self::from_matrix(transform.to_matrix())
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    /// Translation column.
    pub fn translation(&self) -> Vec3 {
        let [x, y, z, _] = self.model[3];
        Vec3::new(x, y, z)
    }
}

/// Per-instance RGB color.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceColor {
    pub rgb: [f32; 3],
}

impl From<Vec3> for InstanceColor {
    fn from(color: Vec3) -> Self {
        Self {
            rgb: color.to_array(),
        }
    }
}

/// Destination for instance data, typically a pair of GPU vertex buffers.
pub trait InstanceSink {
    /// Replace the instanced transforms. `transforms[i]` is particle `i`.
    fn upload_transforms(&mut self, transforms: &[InstanceTransform]);

    /// Replace the instanced colors. `colors[i]` is particle `i`.
    fn upload_colors(&mut self, colors: &[InstanceColor]);
}

/// CPU-side instance storage for one population.
#[derive(Debug, Clone, Default)]
pub struct InstanceBuffer {
    transforms: Vec<InstanceTransform>,
    colors: Vec<InstanceColor>,
    transforms_dirty: bool,
    colors_dirty: bool,
}

impl InstanceBuffer {
    /// Create a buffer for `transforms.len()` particles with baked colors.
    ///
    /// Both arrays are dirty until the first upload.
    pub fn new(transforms: &[Transform], colors: &[Vec3]) -> Self {
        debug_assert_eq!(transforms.len(), colors.len());
        Self {
            transforms: transforms.iter().map(InstanceTransform::from_transform).collect(),
            colors: colors.iter().copied().map(InstanceColor::from).collect(),
            transforms_dirty: true,
            colors_dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    pub fn colors(&self) -> &[InstanceColor] {
        &self.colors
    }

    /// Transforms as raw bytes, ready for a vertex buffer.
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    /// Colors as raw bytes, ready for a vertex buffer.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn transforms_dirty(&self) -> bool {
        self.transforms_dirty
    }

    pub fn colors_dirty(&self) -> bool {
        self.colors_dirty
    }

    /// Overwrite every transform slot in one pass and mark the buffer dirty.
    ///
    /// `write` is called once per slot, in order, with the slot index. The
    /// whole frame lands or nothing does; there is no partial-write API.
    pub(crate) fn write_frame<F>(&mut self, mut write: F)
    where
        F: FnMut(usize) -> InstanceTransform,
    {
        for (i, slot) in self.transforms.iter_mut().enumerate() {
            *slot = write(i);
        }
        self.transforms_dirty = true;
    }

    /// Push dirty data to `sink` and clear the dirty flags.
    ///
    /// Returns `true` if anything was uploaded.
    pub fn flush(&mut self, sink: &mut impl InstanceSink) -> bool {
        let mut uploaded = false;
        if self.colors_dirty {
            sink.upload_colors(&self.colors);
            self.colors_dirty = false;
            uploaded = true;
        }
        if self.transforms_dirty {
            sink.upload_transforms(&self.transforms);
            self.transforms_dirty = false;
            uploaded = true;
        }
        uploaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[derive(Default)]
    struct CountingSink {
        transforms: usize,
        colors: usize,
        last_len: usize,
    }

    impl InstanceSink for CountingSink {
        fn upload_transforms(&mut self, transforms: &[InstanceTransform]) {
            self.transforms += 1;
            self.last_len = transforms.len();
        }

        fn upload_colors(&mut self, _colors: &[InstanceColor]) {
            self.colors += 1;
        }
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(std::mem::size_of::<InstanceTransform>(), 64);
        assert_eq!(std::mem::size_of::<InstanceColor>(), 12);
    }

    #[test]
    fn test_from_transform_roundtrip() {
        let t = Transform::new(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(0.1, 0.8, 0.1),
        );
        let instance = InstanceTransform::from_transform(&t);
        assert_eq!(instance.translation(), t.position);
        let (scale, rotation, translation) = instance.matrix().to_scale_rotation_translation();
        assert!(scale.distance(t.scale) < 1e-5);
        assert!(rotation.angle_between(t.rotation) < 1e-3);
        assert!(translation.distance(t.position) < 1e-6);
    }

    #[test]
    fn test_flush_clears_dirty_flags() {
        let transforms = vec![Transform::IDENTITY; 4];
        let colors = vec![Vec3::ONE; 4];
        let mut buffer = InstanceBuffer::new(&transforms, &colors);
        let mut sink = CountingSink::default();

        assert!(buffer.flush(&mut sink));
        assert_eq!((sink.transforms, sink.colors, sink.last_len), (1, 1, 4));
        assert!(!buffer.flush(&mut sink));

        buffer.write_frame(|_| InstanceTransform::IDENTITY);
        assert!(buffer.transforms_dirty());
        assert!(!buffer.colors_dirty());
        assert!(buffer.flush(&mut sink));
        assert_eq!((sink.transforms, sink.colors), (2, 1));
    }

    #[test]
    fn test_byte_views() {
        let buffer = InstanceBuffer::new(&[Transform::IDENTITY; 3], &[Vec3::X; 3]);
        assert_eq!(buffer.transform_bytes().len(), 3 * 64);
        assert_eq!(buffer.color_bytes().len(), 3 * 12);
        assert_eq!(buffer.colors()[0].rgb, [1.0, 0.0, 0.0]);
    }
}
