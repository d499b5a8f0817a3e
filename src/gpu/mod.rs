mod bind_group;
mod buffer;
mod context;
mod pipeline;
mod resources;
mod texture;

pub use bind_group::{BindGroupBuilder, BindGroupLayoutBuilder};
pub use buffer::BulkBufferBuilder;
pub use context::GpuContext;
pub use pipeline::{RaytraceKernel, SdfKernel};
pub use resources::GpuWorldBuffers;
pub use texture::RaytraceOutputs;
