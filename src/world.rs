use glam::UVec3;

use crate::brick_grid::BrickGrid;
use crate::brick_handle::{BrickHandle, HandleState};
use crate::brick_storage::{BitsPerVoxel, BrickStorage, BrickStorageOffset, BRICK_VOLUME};
use crate::error::Result;
use crate::material::{Material, MaterialId, MaterialTable, PaletteOffset, PaletteTable};
use crate::raytrace::{self, PixelOutput, RayTraceParams};
use crate::sdf;

/// Arena capacities a [`BrickmapWorld`] is built with.
#[derive(Debug, Clone, Copy)]
pub struct BrickmapWorldConfig {
    pub grid_dims: UVec3,
    pub max_materials: usize,
    pub max_palette_words: usize,
    pub max_storage_words: usize,
}

/// Owns the material/palette table, brick storage arena, and outer grid:
/// the host's single entry point for building and querying a brickmap,
/// generalizing the teacher's `BrickmapManager`.
pub struct BrickmapWorld {
    materials: MaterialTable,
    palettes: PaletteTable,
    storage: BrickStorage,
    grid: BrickGrid,
}

impl BrickmapWorld {
    pub fn new(config: BrickmapWorldConfig) -> Self {
        Self {
            materials: MaterialTable::new(config.max_materials),
            palettes: PaletteTable::new(config.max_palette_words),
            storage: BrickStorage::new(config.max_storage_words),
            grid: BrickGrid::new(config.grid_dims),
        }
    }

    pub fn add_material(&mut self, material: Material) -> Result<MaterialId> {
        self.materials.intern_material(material)
    }

    pub fn intern_palette(&mut self, material_ids: &[u32]) -> Result<PaletteOffset> {
        self.palettes.intern_palette(material_ids)
    }

    /// Packs `voxels` against `palette_ids`, choosing the narrowest bit
    /// width the palette allows, and returns a `Data` handle ready to be
    /// placed in the grid with [`BrickmapWorld::set_handle`].
    pub fn upload_brick(&mut self, voxels: &[u32; BRICK_VOLUME], palette_ids: &[u32]) -> Result<BrickHandle> {
        let palette_offset = self.intern_palette(palette_ids)?;
        let bits = BitsPerVoxel::for_palette_len(self.palettes.palette_len(palette_offset));
        let (trace_brick, _offset): (_, BrickStorageOffset) = self.storage.write_brick(palette_offset, bits, voxels)?;
        Ok(BrickHandle::encode(HandleState::Data { trace_brick }))
    }

    /// Writes `handle` into the outer grid at `pos`, returning the
    /// previous occupant.
    pub fn set_handle(&mut self, pos: UVec3, handle: BrickHandle) -> BrickHandle {
        self.grid.set(pos, handle)
    }

    /// Runs the jump-flood SDF sweep over the current grid topology. Must
    /// be called after any batch of `set_handle` calls and before the next
    /// ray dispatch: the grid has no implicit re-propagation on read.
    pub fn dispatch_sdf(&mut self) {
        sdf::propagate_cpu(&mut self.grid);
    }

    pub fn trace_pixel(&self, params: &RayTraceParams, px: u32, py: u32) -> PixelOutput {
        raytrace::trace_pixel_cpu(&self.grid, &self.storage, &self.materials, &self.palettes, params, px, py)
    }

    pub fn grid(&self) -> &BrickGrid {
        &self.grid
    }

    pub fn storage(&self) -> &BrickStorage {
        &self.storage
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn palettes(&self) -> &PaletteTable {
        &self.palettes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick_storage::BRICK_VOLUME;

    fn small_world() -> BrickmapWorld {
        BrickmapWorld::new(BrickmapWorldConfig {
            grid_dims: UVec3::new(4, 4, 4),
            max_materials: 16,
            max_palette_words: 256,
            max_storage_words: 4096,
        })
    }

    #[test]
    fn upload_brick_then_set_handle_round_trips_through_classify() {
        let mut world = small_world();
        let stone = world
            .add_material(Material::new([0.5, 0.5, 0.5, 1.0], [0.0; 3], 1.0, 0.0, 0.9))
            .unwrap();

        let mut voxels = [0u32; BRICK_VOLUME];
        voxels[0] = 1;
        let handle = world.upload_brick(&voxels, &[stone.0]).unwrap();
        world.set_handle(UVec3::new(0, 0, 0), handle);

        let HandleState::Data { trace_brick } = world.grid().classify(glam::IVec3::ZERO) else {
            panic!("expected a data handle");
        };
        assert!(world.storage().trace_brick(trace_brick).is_occupied(UVec3::ZERO));
    }

    #[test]
    fn dispatch_sdf_propagates_distances_after_ingest() {
        let mut world = small_world();
        let mut voxels = [0u32; BRICK_VOLUME];
        voxels[0] = 1;
        let material = world.add_material(Material::default()).unwrap();
        let handle = world.upload_brick(&voxels, &[material.0]).unwrap();
        world.set_handle(UVec3::new(3, 3, 3), handle);

        world.dispatch_sdf();

        let HandleState::Empty { distance } = world.grid().classify(glam::IVec3::ZERO) else {
            panic!("expected an empty cell");
        };
        assert!(distance > 0);
    }
}
