use bytemuck::{Pod, Zeroable};
use glam::UVec3;

use crate::error::{CoreError, Result};
use crate::material::PaletteOffset;
use crate::math::to_1d_index;

/// Voxels per brick edge.
pub const BRICK_EDGE: u32 = 8;
/// Voxels per brick.
pub const BRICK_VOLUME: usize = (BRICK_EDGE * BRICK_EDGE * BRICK_EDGE) as usize;

/// Bit width used to pack one voxel's palette index.
///
/// `b` is the smallest of `{1, 2, 4, 8}` with `2^b >= palette.length`, so a
/// brick never spends more bits per voxel than its own palette needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitsPerVoxel {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

impl BitsPerVoxel {
    pub fn for_palette_len(len: u32) -> Self {
        match len {
            0..=2 => BitsPerVoxel::One,
            3..=4 => BitsPerVoxel::Two,
            5..=16 => BitsPerVoxel::Four,
            _ => BitsPerVoxel::Eight,
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Encodes into the 3-bit code stored in `TraceBrick::brick`'s top bits.
    /// The mapping is not a clean power-of-two ladder: 0 -> 1 bpv, 1 -> 2
    /// bpv, 3 -> 4 bpv, everything else -> 8 bpv. This is the wire format,
    /// not a convenience encoding, so `code`/`from_code` are the only place
    /// that may know it.
    fn code(self) -> u32 {
        match self {
            BitsPerVoxel::One => 0,
            BitsPerVoxel::Two => 1,
            BitsPerVoxel::Four => 3,
            BitsPerVoxel::Eight => 2,
        }
    }

    fn from_code(code: u32) -> Self {
        match code {
            0 => BitsPerVoxel::One,
            1 => BitsPerVoxel::Two,
            3 => BitsPerVoxel::Four,
            _ => BitsPerVoxel::Eight,
        }
    }
}

/// A brick's on-device trace record: which voxels are occupied, and where
/// its packed payload and palette live.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TraceBrick {
    /// One bit per voxel, linearized `x + 8y + 64z`, set when occupied.
    pub occupancy: [u32; 16],
    /// Top 3 bits: bits-per-voxel code. Bottom 29 bits: byte offset into
    /// the packed payload arena.
    pub brick: u32,
    /// Word offset into the palette arena.
    pub palette: u32,
}

const _: () = assert!(std::mem::size_of::<TraceBrick>() == 72);

const OFFSET_MASK: u32 = (1 << 29) - 1;

impl TraceBrick {
    fn bits_per_voxel(self) -> BitsPerVoxel {
        BitsPerVoxel::from_code(self.brick >> 29)
    }

    fn payload_word_offset(self) -> usize {
        ((self.brick & OFFSET_MASK) / 4) as usize
    }

    pub fn is_occupied(self, local: UVec3) -> bool {
        let linear = local_to_linear(local);
        (self.occupancy[linear / 32] >> (linear % 32)) & 1 != 0
    }
}

/// Opaque handle into the [`BrickStorage`] trace-brick table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceBrickId(pub u32);

/// Byte offset of a brick's packed payload within the storage arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickStorageOffset(pub u32);

fn local_to_linear(local: UVec3) -> usize {
    to_1d_index(local, UVec3::splat(BRICK_EDGE))
}

/// Packed voxel payload arena plus the trace-brick table that addresses it.
///
/// Mirrors the `BrickmapCache` pattern: a flat `u32` arena grown
/// append-only, with handles into a side table rather than pointers, so the
/// whole thing is `bytemuck`-uploadable as-is.
#[derive(Debug, Default)]
pub struct BrickStorage {
    arena: Vec<u32>,
    trace_bricks: Vec<TraceBrick>,
    max_arena_words: usize,
}

impl BrickStorage {
    pub fn new(max_arena_words: usize) -> Self {
        Self {
            arena: Vec::new(),
            trace_bricks: Vec::new(),
            max_arena_words,
        }
    }

    /// Packs `voxels` (512 palette-local indices, 0 meaning empty) at
    /// `bits` bits per voxel, appends them to the arena, and records a new
    /// [`TraceBrick`] pointing at `palette_offset`.
    pub fn write_brick(
        &mut self,
        palette_offset: PaletteOffset,
        bits: BitsPerVoxel,
        voxels: &[u32; BRICK_VOLUME],
    ) -> Result<(TraceBrickId, BrickStorageOffset)> {
        let voxels_per_word = 32 / bits.bits();
        let word_count = (BRICK_VOLUME as u32).div_ceil(voxels_per_word) as usize;

        if self.arena.len() + word_count > self.max_arena_words {
            return Err(CoreError::OutOfSpace {
                arena: "brick storage",
                requested: self.arena.len() + word_count,
                available: self.max_arena_words,
            });
        }

        let word_offset = self.arena.len();
        let mask = (1u32 << bits.bits()) - 1;
        let mut words = vec![0u32; word_count];
        let mut occupancy = [0u32; 16];

        for (i, &v) in voxels.iter().enumerate() {
            if v != 0 {
                occupancy[i / 32] |= 1 << (i % 32);
            }
            let word_index = i / voxels_per_word as usize;
            let bit_offset = (i % voxels_per_word as usize) as u32 * bits.bits();
            words[word_index] |= (v & mask) << bit_offset;
        }

        self.arena.extend_from_slice(&words);

        let byte_offset = (word_offset as u32) * 4;
        let brick_field = (bits.code() << 29) | (byte_offset & OFFSET_MASK);
        let trace_brick = TraceBrick {
            occupancy,
            brick: brick_field,
            palette: palette_offset.0,
        };

        let id = TraceBrickId(self.trace_bricks.len() as u32);
        self.trace_bricks.push(trace_brick);
        Ok((id, BrickStorageOffset(byte_offset)))
    }

    pub fn trace_brick(&self, id: TraceBrickId) -> TraceBrick {
        self.trace_bricks[id.0 as usize]
    }

    /// Reads the packed palette index for `local` within `id`'s brick.
    pub fn read_voxel(&self, id: TraceBrickId, local: UVec3) -> u32 {
        let tb = self.trace_brick(id);
        let bits = tb.bits_per_voxel();
        let voxels_per_word = 32 / bits.bits();
        let linear = local_to_linear(local);
        let word_index = tb.payload_word_offset() + linear / voxels_per_word as usize;
        let bit_offset = (linear % voxels_per_word as usize) as u32 * bits.bits();
        let mask = (1u32 << bits.bits()) - 1;
        (self.arena[word_index] >> bit_offset) & mask
    }

    pub fn trace_bricks(&self) -> &[TraceBrick] {
        &self.trace_bricks
    }

    pub fn arena(&self) -> &[u32] {
        &self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PaletteOffset;

    fn period4_pattern() -> [u32; BRICK_VOLUME] {
        let mut voxels = [0u32; BRICK_VOLUME];
        for (i, v) in voxels.iter_mut().enumerate() {
            *v = (i % 4) as u32;
        }
        voxels
    }

    #[test]
    fn pack_unpack_round_trip_four_bit() {
        let mut storage = BrickStorage::new(4096);
        let voxels = period4_pattern();
        let (id, _) = storage
            .write_brick(PaletteOffset(0), BitsPerVoxel::Four, &voxels)
            .unwrap();

        for z in 0..8u32 {
            for y in 0..8u32 {
                for x in 0..8u32 {
                    let local = UVec3::new(x, y, z);
                    let linear = local_to_linear(local);
                    assert_eq!(storage.read_voxel(id, local), (linear % 4) as u32);
                }
            }
        }
    }

    #[test]
    fn bits_per_voxel_matches_palette_length_ladder() {
        assert_eq!(BitsPerVoxel::for_palette_len(1).bits(), 1);
        assert_eq!(BitsPerVoxel::for_palette_len(2).bits(), 1);
        assert_eq!(BitsPerVoxel::for_palette_len(3).bits(), 2);
        assert_eq!(BitsPerVoxel::for_palette_len(4).bits(), 2);
        assert_eq!(BitsPerVoxel::for_palette_len(16).bits(), 4);
        assert_eq!(BitsPerVoxel::for_palette_len(17).bits(), 8);
        assert_eq!(BitsPerVoxel::for_palette_len(256).bits(), 8);
    }

    #[test]
    fn occupancy_bitmap_matches_nonzero_voxels() {
        let mut storage = BrickStorage::new(4096);
        let mut voxels = [0u32; BRICK_VOLUME];
        voxels[local_to_linear(UVec3::new(4, 4, 4))] = 1;
        let (id, _) = storage
            .write_brick(PaletteOffset(0), BitsPerVoxel::One, &voxels)
            .unwrap();
        let tb = storage.trace_brick(id);
        assert!(tb.is_occupied(UVec3::new(4, 4, 4)));
        assert!(!tb.is_occupied(UVec3::new(0, 0, 0)));
    }

    #[test]
    fn arena_exhaustion_reports_out_of_space() {
        let mut storage = BrickStorage::new(8);
        let voxels = period4_pattern();
        let err = storage
            .write_brick(PaletteOffset(0), BitsPerVoxel::Eight, &voxels)
            .unwrap_err();
        assert!(matches!(err, CoreError::OutOfSpace { .. }));
    }
}
