use wgpu::util::DeviceExt;

use super::GpuContext;
use crate::world::BrickmapWorld;

/// Device-side mirror of a [`BrickmapWorld`]'s arenas.
///
/// Reuploaded wholesale on `upload`, not streamed incrementally: the
/// crate's non-goals exclude supporting efficient per-frame full-world
/// uploads, and the host only calls `upload` after a batch of topology
/// edits, not every dispatch.
pub struct GpuWorldBuffers {
    pub grid: wgpu::Buffer,
    pub trace_bricks: wgpu::Buffer,
    pub storage_arena: wgpu::Buffer,
    pub palette_arena: wgpu::Buffer,
    pub materials: wgpu::Buffer,
}

impl GpuWorldBuffers {
    pub fn upload(context: &GpuContext, world: &BrickmapWorld) -> Self {
        let handles: Vec<u32> = world.grid().handles().iter().map(|h| h.0).collect();

        let buffer_of = |label: &str, contents: &[u8], usage: wgpu::BufferUsages| {
            context.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: if contents.is_empty() { &[0u8; 4] } else { contents },
                usage,
            })
        };

        let storage_usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;

        Self {
            grid: buffer_of("brickgrid-handles", bytemuck::cast_slice(&handles), storage_usage),
            trace_bricks: buffer_of(
                "trace-bricks",
                bytemuck::cast_slice(world.storage().trace_bricks()),
                storage_usage,
            ),
            storage_arena: buffer_of(
                "brick-storage-arena",
                bytemuck::cast_slice(world.storage().arena()),
                storage_usage,
            ),
            palette_arena: buffer_of(
                "palette-arena",
                bytemuck::cast_slice(world.palettes().as_slice()),
                storage_usage,
            ),
            materials: buffer_of(
                "material-table",
                bytemuck::cast_slice(world.materials().as_slice()),
                storage_usage,
            ),
        }
    }
}
