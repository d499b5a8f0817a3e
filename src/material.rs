use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::error::{CoreError, Result};

/// Shading parameters for one palette entry, uploaded verbatim to the GPU
/// material table. Layout is fixed at 48 bytes so it matches the wire
/// format the ray traversal kernel reads.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub color: [f32; 4],
    pub emissive: [f32; 3],
    pub opacity: f32,
    pub metallic: f32,
    pub roughness: f32,
    _pad: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<Material>() == 48);

impl Material {
    pub fn new(color: [f32; 4], emissive: [f32; 3], opacity: f32, metallic: f32, roughness: f32) -> Self {
        Self {
            color,
            emissive,
            opacity,
            metallic,
            roughness,
            _pad: [0.0; 2],
        }
    }
}

/// Index into a [`MaterialTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaterialId(pub u32);

/// Deduplicating arena of [`Material`] values.
///
/// Two byte-identical materials always intern to the same id: callers that
/// re-submit the same shading parameters (a common case when palettes are
/// rebuilt from scratch each ingest) never grow the table.
#[derive(Debug, Default)]
pub struct MaterialTable {
    materials: Vec<Material>,
    index: HashMap<[u8; 48], MaterialId>,
    max_materials: usize,
}

impl MaterialTable {
    pub fn new(max_materials: usize) -> Self {
        Self {
            materials: Vec::new(),
            index: HashMap::new(),
            max_materials,
        }
    }

    pub fn intern_material(&mut self, material: Material) -> Result<MaterialId> {
        let key: [u8; 48] = bytemuck::cast(material);
        if let Some(&id) = self.index.get(&key) {
            return Ok(id);
        }
        if self.materials.len() >= self.max_materials {
            return Err(CoreError::OutOfSpace {
                arena: "material table",
                requested: self.materials.len() + 1,
                available: self.max_materials,
            });
        }
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        self.index.insert(key, id);
        Ok(id)
    }

    /// Reads back a materal by id. `id` must have come from `intern_material`
    /// on this table; out-of-range ids are a host-side programming error.
    pub fn material(&self, id: MaterialId) -> Material {
        debug_assert!((id.0 as usize) < self.materials.len(), "unknown material id {:?}", id);
        self.materials[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn as_slice(&self) -> &[Material] {
        &self.materials
    }
}

/// Byte offset of a canonical palette within the [`PaletteTable`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaletteOffset(pub u32);

/// Canonicalized, deduplicated palette arena.
///
/// A palette is a small set of [`MaterialId`]s referenced by a brick's
/// packed indices. Submitted id lists are sorted and deduplicated before
/// interning so that two bricks which differ only in the order voxels were
/// authored still share one arena entry.
#[derive(Debug, Default)]
pub struct PaletteTable {
    arena: Vec<u32>,
    lengths: HashMap<PaletteOffset, u32>,
    index: HashMap<Vec<u32>, PaletteOffset>,
    max_words: usize,
}

impl PaletteTable {
    pub fn new(max_words: usize) -> Self {
        Self {
            arena: Vec::new(),
            lengths: HashMap::new(),
            index: HashMap::new(),
            max_words,
        }
    }

    pub fn intern_palette(&mut self, material_ids: &[u32]) -> Result<PaletteOffset> {
        let mut canon = material_ids.to_vec();
        canon.sort_unstable();
        canon.dedup();

        if let Some(&offset) = self.index.get(&canon) {
            return Ok(offset);
        }

        if self.arena.len() + canon.len() > self.max_words {
            return Err(CoreError::OutOfSpace {
                arena: "palette table",
                requested: self.arena.len() + canon.len(),
                available: self.max_words,
            });
        }

        let offset = PaletteOffset(self.arena.len() as u32);
        self.lengths.insert(offset, canon.len() as u32);
        self.arena.extend_from_slice(&canon);
        self.index.insert(canon, offset);
        Ok(offset)
    }

    pub fn palette_len(&self, offset: PaletteOffset) -> u32 {
        self.lengths[&offset]
    }

    /// Reads the material id at `local_index` within the palette starting
    /// at `offset`. `local_index` must be within `palette_len(offset)`.
    pub fn palette_entry(&self, offset: PaletteOffset, local_index: u32) -> u32 {
        self.arena[offset.0 as usize + local_index as usize]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_identical_materials_is_idempotent() {
        let mut table = MaterialTable::new(16);
        let stone = Material::new([0.5, 0.5, 0.5, 1.0], [0.0; 3], 1.0, 0.0, 0.8);
        let a = table.intern_material(stone).unwrap();
        let b = table.intern_material(stone).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn material_table_reports_out_of_space() {
        let mut table = MaterialTable::new(1);
        table.intern_material(Material::default()).unwrap();
        let err = table
            .intern_material(Material::new([1.0, 0.0, 0.0, 1.0], [0.0; 3], 1.0, 0.0, 0.5))
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfSpace { .. }));
    }

    #[test]
    fn palette_canonicalization_dedupes_permutations() {
        let mut palettes = PaletteTable::new(64);
        let a = palettes.intern_palette(&[3, 1, 2, 1]).unwrap();
        let b = palettes.intern_palette(&[2, 3, 1]).unwrap();
        assert_eq!(a, b);
        assert_eq!(palettes.palette_len(a), 3);
        assert_eq!(palettes.palette_entry(a, 0), 1);
        assert_eq!(palettes.palette_entry(a, 2), 3);
    }

    #[test]
    fn distinct_palettes_get_distinct_offsets() {
        let mut palettes = PaletteTable::new(64);
        let a = palettes.intern_palette(&[1, 2]).unwrap();
        let b = palettes.intern_palette(&[5, 6, 7]).unwrap();
        assert_ne!(a, b);
    }
}
