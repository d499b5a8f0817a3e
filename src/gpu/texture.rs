use super::GpuContext;

/// The four storage-write images a ray traversal dispatch produces. No
/// sampler or sampled-texture bind group is built here: the kernel writes
/// these with `textureStore`, and nothing downstream of this crate samples
/// them, so a full `Texture`-with-sampler wrapper would be unused surface.
pub struct RaytraceOutputs {
    pub albedo: wgpu::Texture,
    pub depth: wgpu::Texture,
    pub normal: wgpu::Texture,
    pub intensity: wgpu::Texture,
}

impl RaytraceOutputs {
    pub fn new(context: &GpuContext, width: u32, height: u32) -> Self {
        let make = |label: &str, format: wgpu::TextureFormat| {
            context.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        };

        Self {
            albedo: make("raytrace-albedo", wgpu::TextureFormat::Rgba8Unorm),
            depth: make("raytrace-depth", wgpu::TextureFormat::R32Float),
            normal: make("raytrace-normal", wgpu::TextureFormat::Rgba8Unorm),
            intensity: make("raytrace-intensity", wgpu::TextureFormat::R32Float),
        }
    }

    pub fn albedo_view(&self) -> wgpu::TextureView {
        self.albedo.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn depth_view(&self) -> wgpu::TextureView {
        self.depth.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn normal_view(&self) -> wgpu::TextureView {
        self.normal.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn intensity_view(&self) -> wgpu::TextureView {
        self.intensity.create_view(&wgpu::TextureViewDescriptor::default())
    }
}
