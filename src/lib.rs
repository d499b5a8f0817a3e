pub mod brick_grid;
pub mod brick_handle;
pub mod brick_storage;
mod dda;
pub mod error;
pub mod gpu;
pub mod material;
mod math;
pub mod raytrace;
pub mod sdf;
pub mod world;

pub use brick_grid::BrickGrid;
pub use brick_handle::{BrickHandle, HandleState};
pub use brick_storage::{BitsPerVoxel, BrickStorage, TraceBrick, TraceBrickId};
pub use error::{CoreError, Result};
pub use material::{Material, MaterialId, MaterialTable, PaletteOffset, PaletteTable};
pub use world::{BrickmapWorld, BrickmapWorldConfig};

/// Initializes the crate's `env_logger` backend. Safe to call more than
/// once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
