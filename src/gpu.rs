//! wgpu vertex buffers for instanced particle rendering.
//!
//! [`GpuInstanceBuffers`] holds one transform buffer and one color buffer per
//! population, both stepped per instance. Borrow a [`GpuUploader`] each frame
//! and pass it to [`Population::upload`](crate::population::Population::upload);
//! only dirty data is written.

use crate::instance::{InstanceBuffer, InstanceColor, InstanceSink, InstanceTransform};
use wgpu::util::DeviceExt;

const TRANSFORM_STRIDE: usize = std::mem::size_of::<InstanceTransform>();
const COLOR_STRIDE: usize = std::mem::size_of::<InstanceColor>();

/// Instance-rate vertex buffers for one population.
#[derive(Debug)]
pub struct GpuInstanceBuffers {
    transforms: wgpu::Buffer,
    colors: wgpu::Buffer,
    capacity: usize,
    len: usize,
}

impl GpuInstanceBuffers {
    /// Model matrix columns at shader locations 2..=5.
    pub const TRANSFORM_ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![2 => Float32x4, 3 => Float32x4, 4 => Float32x4, 5 => Float32x4];

    /// RGB color at shader location 6.
    pub const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
        wgpu::vertex_attr_array![6 => Float32x3];

    /// Allocate empty buffers for up to `capacity` instances.
    pub fn new(device: &wgpu::Device, label: &str, capacity: usize) -> Self {
        let slots = capacity.max(1);
        let transforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Instance Transforms")),
            size: (slots * TRANSFORM_STRIDE) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let colors = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Instance Colors")),
            size: (slots * COLOR_STRIDE) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            transforms,
            colors,
            capacity,
            len: 0,
        }
    }

    /// Create buffers sized for `instances` and filled with its current
    /// contents.
    pub fn from_instances(device: &wgpu::Device, label: &str, instances: &InstanceBuffer) -> Self {
        if instances.is_empty() {
            return Self::new(device, label, 0);
        }
        let transforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Instance Transforms")),
            contents: instances.transform_bytes(),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let colors = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Instance Colors")),
            contents: instances.color_bytes(),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            transforms,
            colors,
            capacity: instances.len(),
            len: instances.len(),
        }
    }

    /// Layout of the transform buffer, one model matrix per instance.
    pub fn transform_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: TRANSFORM_STRIDE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::TRANSFORM_ATTRIBUTES,
        }
    }

    /// Layout of the color buffer, one RGB triple per instance.
    pub fn color_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: COLOR_STRIDE as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::COLOR_ATTRIBUTES,
        }
    }

    pub fn transform_buffer(&self) -> &wgpu::Buffer {
        &self.transforms
    }

    pub fn color_buffer(&self) -> &wgpu::Buffer {
        &self.colors
    }

    /// Maximum number of instances the buffers can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of instances written by the last transform upload; use as the
    /// instance count of the draw call.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Borrow a sink that writes into these buffers through `queue`.
    pub fn uploader<'a>(&'a mut self, queue: &'a wgpu::Queue) -> GpuUploader<'a> {
        GpuUploader {
            queue,
            buffers: self,
        }
    }

    fn clamp_len(&self, len: usize, what: &str) -> usize {
        if len > self.capacity {
            log::warn!(
                "{} instance upload of {} exceeds capacity {}; truncating",
                what,
                len,
                self.capacity
            );
        }
        len.min(self.capacity)
    }
}

/// [`InstanceSink`] writing into a [`GpuInstanceBuffers`] via `Queue::write_buffer`.
pub struct GpuUploader<'a> {
    queue: &'a wgpu::Queue,
    buffers: &'a mut GpuInstanceBuffers,
}

impl InstanceSink for GpuUploader<'_> {
    fn upload_transforms(&mut self, transforms: &[InstanceTransform]) {
        let n = self.buffers.clamp_len(transforms.len(), "Transform");
        if n > 0 {
            self.queue.write_buffer(
                &self.buffers.transforms,
                0,
                bytemuck::cast_slice(&transforms[..n]),
            );
        }
        self.buffers.len = n;
    }

    fn upload_colors(&mut self, colors: &[InstanceColor]) {
        let n = self.buffers.clamp_len(colors.len(), "Color");
        if n > 0 {
            self.queue
                .write_buffer(&self.buffers.colors, 0, bytemuck::cast_slice(&colors[..n]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_match_records() {
        let transform = GpuInstanceBuffers::transform_layout();
        assert_eq!(transform.array_stride, 64);
        assert_eq!(transform.step_mode, wgpu::VertexStepMode::Instance);
        let offsets: Vec<u64> = transform.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 32, 48]);

        let color = GpuInstanceBuffers::color_layout();
        assert_eq!(color.array_stride, 12);
        assert_eq!(color.attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(color.attributes[0].shader_location, 6);
    }
}
