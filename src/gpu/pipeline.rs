use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::bind_group::{BindGroupBuilder, BindGroupLayoutBuilder};
use super::resources::GpuWorldBuffers;
use super::texture::RaytraceOutputs;
use super::GpuContext;
use crate::raytrace::RayTraceParams;

/// Uniform payload for one jump-flood step dispatch, mirroring the CPU
/// reference's `(grid, step, max_dim)` inputs.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SdfStepUniform {
    dims: [u32; 3],
    radius: u32,
}

/// Compute pipeline for the SDF jump-flood propagation kernel (C4).
pub struct SdfKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl SdfKernel {
    pub fn new(context: &GpuContext) -> Self {
        let shader = context
            .device
            .create_shader_module(wgpu::include_wgsl!("../../assets/shaders/sdf_propagate.wgsl"));

        let bind_group_layout = BindGroupLayoutBuilder::new()
            .with_label("sdf-propagate-bind-group-layout")
            .with_uniform_entry(wgpu::ShaderStages::COMPUTE)
            .with_rw_storage_entry(wgpu::ShaderStages::COMPUTE)
            .build(context);

        let pipeline_layout = context.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sdf-propagate-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = context
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("sdf-propagate-pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "main",
            });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Dispatches one jump-flood step (`step` is 1-indexed, matching
    /// `sdf::propagate_cpu_step`) against the grid buffer in `buffers`.
    pub fn dispatch_step(&self, context: &GpuContext, buffers: &GpuWorldBuffers, dims: [u32; 3], step: u32, max_dim: u32) {
        let radius = max_dim >> (step - 1);
        if radius == 0 {
            return;
        }

        let uniform = SdfStepUniform { dims, radius };
        let uniform_buffer = context.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sdf-step-uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = BindGroupBuilder::new()
            .with_label("sdf-propagate-bind-group")
            .with_layout(&self.bind_group_layout)
            .with_entry(uniform_buffer.as_entire_binding())
            .with_entry(buffers.grid.as_entire_binding())
            .build(context)
            .expect("sdf bind group has a layout");

        let mut encoder = context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sdf-propagate-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("sdf-propagate-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(dims[0].div_ceil(8), dims[1].div_ceil(8), dims[2].div_ceil(4));
        }
        context.queue.submit(Some(encoder.finish()));
    }
}

/// Uniform payload for one ray traversal dispatch.
///
/// Fields are laid out as plain scalars with `camera_pos` last, matching
/// the host-shareable struct the shader declares byte for byte: WGSL's
/// uniform address space requires `vec3<f32>`/`mat4x4<f32>` members to sit
/// at 16-byte-aligned offsets, so only the trailing position vector (padded
/// up front to land on that boundary) uses a vector type at all.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct RaytraceUniform {
    inverse_view_proj: [[f32; 4]; 4],
    max_ray_steps: u32,
    viewport_w: u32,
    viewport_h: u32,
    grid_dims_x: u32,
    grid_dims_y: u32,
    grid_dims_z: u32,
    _pad0: u32,
    _pad1: u32,
    camera_pos: [f32; 3],
    _pad2: u32,
}

/// Compute pipeline for the two-level DDA ray traversal kernel (C5).
pub struct RaytraceKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl RaytraceKernel {
    pub fn new(context: &GpuContext) -> Self {
        let shader = context
            .device
            .create_shader_module(wgpu::include_wgsl!("../../assets/shaders/raytrace.wgsl"));

        let bind_group_layout = BindGroupLayoutBuilder::new()
            .with_label("raytrace-bind-group-layout")
            .with_uniform_entry(wgpu::ShaderStages::COMPUTE)
            .with_ro_storage_entry(wgpu::ShaderStages::COMPUTE)
            .with_ro_storage_entry(wgpu::ShaderStages::COMPUTE)
            .with_ro_storage_entry(wgpu::ShaderStages::COMPUTE)
            .with_ro_storage_entry(wgpu::ShaderStages::COMPUTE)
            .with_ro_storage_entry(wgpu::ShaderStages::COMPUTE)
            .with_entry(
                wgpu::ShaderStages::COMPUTE,
                wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                None,
            )
            .with_entry(
                wgpu::ShaderStages::COMPUTE,
                wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::R32Float,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                None,
            )
            .with_entry(
                wgpu::ShaderStages::COMPUTE,
                wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                None,
            )
            .with_entry(
                wgpu::ShaderStages::COMPUTE,
                wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: wgpu::TextureFormat::R32Float,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                None,
            )
            .build(context);

        let pipeline_layout = context.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("raytrace-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = context
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("raytrace-pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "main",
            });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    pub fn dispatch(
        &self,
        context: &GpuContext,
        buffers: &GpuWorldBuffers,
        outputs: &RaytraceOutputs,
        params: &RayTraceParams,
        grid_dims: [u32; 3],
    ) {
        let uniform = RaytraceUniform {
            inverse_view_proj: params.inverse_view_proj.to_cols_array_2d(),
            max_ray_steps: params.max_ray_steps,
            viewport_w: params.viewport.0,
            viewport_h: params.viewport.1,
            grid_dims_x: grid_dims[0],
            grid_dims_y: grid_dims[1],
            grid_dims_z: grid_dims[2],
            _pad0: 0,
            _pad1: 0,
            camera_pos: params.camera_pos.to_array(),
            _pad2: 0,
        };
        let uniform_buffer = context.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("raytrace-uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let albedo_view = outputs.albedo_view();
        let depth_view = outputs.depth_view();
        let normal_view = outputs.normal_view();
        let intensity_view = outputs.intensity_view();

        let bind_group = BindGroupBuilder::new()
            .with_label("raytrace-bind-group")
            .with_layout(&self.bind_group_layout)
            .with_entry(uniform_buffer.as_entire_binding())
            .with_entry(buffers.grid.as_entire_binding())
            .with_entry(buffers.trace_bricks.as_entire_binding())
            .with_entry(buffers.storage_arena.as_entire_binding())
            .with_entry(buffers.palette_arena.as_entire_binding())
            .with_entry(buffers.materials.as_entire_binding())
            .with_entry(wgpu::BindingResource::TextureView(&albedo_view))
            .with_entry(wgpu::BindingResource::TextureView(&depth_view))
            .with_entry(wgpu::BindingResource::TextureView(&normal_view))
            .with_entry(wgpu::BindingResource::TextureView(&intensity_view))
            .build(context)
            .expect("raytrace bind group has a layout");

        let mut encoder = context.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("raytrace-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("raytrace-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let (w, h) = params.viewport;
            pass.dispatch_workgroups(w.div_ceil(8), h.div_ceil(8), 1);
        }
        context.queue.submit(Some(encoder.finish()));
    }
}
