use std::sync::atomic::{AtomicU32, Ordering};

use glam::{IVec3, UVec3};

use crate::brick_handle::{BrickHandle, HandleState};
use crate::math::to_1d_index;

/// Dense outer grid of brick handles, addressed `x + y*X + z*X*Y`.
///
/// Generalizes the teacher's `Brickgrid`: the same flat `Vec` of tagged
/// words, but classification is delegated to [`BrickHandle`] rather than a
/// bespoke flag enum, and a `mark_seen` feedback bitset replaces the
/// teacher's `staged: HashSet<usize>` streaming-request queue (out of scope
/// here: see the crate's non-goals on per-frame world uploads).
#[derive(Debug)]
pub struct BrickGrid {
    dims: UVec3,
    handles: Vec<BrickHandle>,
    seen: Vec<AtomicU32>,
}

impl BrickGrid {
    pub fn new(dims: UVec3) -> Self {
        let count = (dims.x * dims.y * dims.z) as usize;
        let seen_words = count.div_ceil(32);
        Self {
            dims,
            handles: vec![BrickHandle::EMPTY; count],
            seen: (0..seen_words).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    fn in_bounds(&self, p: IVec3) -> bool {
        p.x >= 0
            && p.y >= 0
            && p.z >= 0
            && (p.x as u32) < self.dims.x
            && (p.y as u32) < self.dims.y
            && (p.z as u32) < self.dims.z
    }

    fn index(&self, p: UVec3) -> usize {
        to_1d_index(p, self.dims)
    }

    /// Bounds-checked read; out-of-bounds coordinates are treated as
    /// permanently empty rather than propagating an error.
    pub fn get(&self, p: IVec3) -> BrickHandle {
        if !self.in_bounds(p) {
            return BrickHandle::EMPTY;
        }
        self.handles[self.index(p.as_uvec3())]
    }

    pub fn classify(&self, p: IVec3) -> HandleState {
        self.get(p).classify()
    }

    /// Writes `handle` at `p`, returning the previous value. `p` must be
    /// in-bounds: host ingest owns coordinate validity.
    pub fn set(&mut self, p: UVec3, handle: BrickHandle) -> BrickHandle {
        let idx = self.index(p);
        std::mem::replace(&mut self.handles[idx], handle)
    }

    /// Records that `p` was visited by a ray this frame. Used by the host
    /// to decide which `LOADING` cells to prioritize for streaming.
    pub fn mark_seen(&self, p: UVec3) {
        let idx = self.index(p);
        self.seen[idx / 32].fetch_or(1 << (idx % 32), Ordering::Relaxed);
    }

    pub fn was_seen(&self, p: UVec3) -> bool {
        let idx = self.index(p);
        (self.seen[idx / 32].load(Ordering::Relaxed) >> (idx % 32)) & 1 != 0
    }

    pub fn clear_seen(&self) {
        for word in &self.seen {
            word.store(0, Ordering::Relaxed);
        }
    }

    pub fn handles(&self) -> &[BrickHandle] {
        &self.handles
    }

    pub fn handles_mut(&mut self) -> &mut [BrickHandle] {
        &mut self.handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick_storage::TraceBrickId;

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let grid = BrickGrid::new(UVec3::new(2, 2, 2));
        assert_eq!(grid.classify(IVec3::new(-1, 0, 0)), HandleState::Empty { distance: 0 });
        assert_eq!(grid.classify(IVec3::new(2, 0, 0)), HandleState::Empty { distance: 0 });
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut grid = BrickGrid::new(UVec3::new(4, 4, 4));
        let handle = BrickHandle::encode(HandleState::Data {
            trace_brick: TraceBrickId(3),
        });
        grid.set(UVec3::new(1, 2, 3), handle);
        assert_eq!(grid.get(IVec3::new(1, 2, 3)), handle);
    }

    #[test]
    fn mark_seen_is_observable_and_clearable() {
        let grid = BrickGrid::new(UVec3::new(4, 4, 4));
        let p = UVec3::new(2, 2, 2);
        assert!(!grid.was_seen(p));
        grid.mark_seen(p);
        assert!(grid.was_seen(p));
        grid.clear_seen();
        assert!(!grid.was_seen(p));
    }
}
