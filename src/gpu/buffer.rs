use bytemuck::NoUninit;
use wgpu::util::DeviceExt;

use super::GpuContext;

/// Builds several initialized buffers in one device round trip, the way
/// a host-ingest batch (brick grid, trace bricks, palette arena, material
/// table) is uploaded together after a topology change.
#[derive(Debug)]
pub struct BulkBufferBuilder<'a> {
    descriptors: Vec<wgpu::util::BufferInitDescriptor<'a>>,
    current_usage: wgpu::BufferUsages,
}

impl<'a> BulkBufferBuilder<'a> {
    pub fn new() -> Self {
        Self {
            descriptors: vec![],
            current_usage: wgpu::BufferUsages::UNIFORM,
        }
    }

    pub fn set_usage(mut self, usage: wgpu::BufferUsages) -> Self {
        self.current_usage = usage;
        self
    }

    pub fn with_buffer(mut self, label: &'a str, contents: &'a [u8]) -> Self {
        self.descriptors.push(wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: self.current_usage,
        });
        self
    }

    pub fn with_bytemuck_buffer<A: NoUninit>(self, label: &'a str, contents: &'a [A]) -> Self {
        self.with_buffer(label, bytemuck::cast_slice(contents))
    }

    pub fn build(self, context: &GpuContext) -> Vec<wgpu::Buffer> {
        self.descriptors
            .into_iter()
            .map(|descriptor| context.device.create_buffer_init(&descriptor))
            .collect()
    }
}

impl<'a> Default for BulkBufferBuilder<'a> {
    fn default() -> Self {
        Self::new()
    }
}
