use anyhow::{Context as _, Result};

/// Headless WGPU device bring-up: instance, adapter, device, queue only.
/// There is no surface or swapchain here — this crate drives compute
/// pipelines and reads back storage buffers/textures, it never presents.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub async fn new(limits: wgpu::Limits) -> Result<Self> {
        log::info!("Initialising headless WGPU context...");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            dx12_shader_compiler: Default::default(),
            ..Default::default()
        });

        log::info!("Requesting GPU adapter...");
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .context("Failed to find suitable GPU adapter")?;

        log::info!("Requesting GPU device...");
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                },
                None,
            )
            .await
            .context("Failed to acquire GPU device")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking convenience wrapper for callers outside an async runtime.
    pub fn new_blocking(limits: wgpu::Limits) -> Result<Self> {
        pollster::block_on(Self::new(limits))
    }
}
