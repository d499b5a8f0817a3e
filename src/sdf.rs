use glam::UVec3;

use crate::brick_grid::BrickGrid;
use crate::brick_handle::{BrickHandle, HandleState, MAX_DISTANCE};

fn ceil_log2(v: u32) -> u32 {
    if v <= 1 {
        0
    } else {
        32 - (v - 1).leading_zeros()
    }
}

/// Number of jump-flood steps needed to cover a grid with largest dimension
/// `max_dim`: `ceil(log2(max_dim)) + 1`.
pub fn step_count(max_dim: u32) -> u32 {
    ceil_log2(max_dim) + 1
}

/// Runs the full jump-flood sweep to completion: a seed step (numbered 0)
/// followed by halving-radius propagation steps numbered `1..step_count`,
/// the last radius being `max_dim >> (step_count - 2)`.
pub fn propagate_cpu(grid: &mut BrickGrid) {
    let dims = grid.dims();
    let max_dim = dims.x.max(dims.y).max(dims.z);
    seed_step(grid);
    for step in 1..step_count(max_dim) {
        propagate_cpu_step(grid, step, max_dim);
    }
}

/// Step 0: every `Empty` cell starts at `MAX_DISTANCE`; `Data`/`Loading`/
/// `Lod` cells are left untouched (their distance is implicitly 0).
fn seed_step(grid: &mut BrickGrid) {
    let dims = grid.dims();
    for z in 0..dims.z {
        for y in 0..dims.y {
            for x in 0..dims.x {
                let p = UVec3::new(x, y, z);
                if let HandleState::Empty { .. } = grid.get(p.as_ivec3()).classify() {
                    grid.set(p, BrickHandle::encode(HandleState::Empty { distance: MAX_DISTANCE }));
                }
            }
        }
    }
}

/// One jump-flood pass at `step` (1-indexed) against a grid whose largest
/// dimension is `max_dim`. Reads a snapshot of the previous step's handles
/// so a cell's own value is never updated from itself mid-pass.
pub fn propagate_cpu_step(grid: &mut BrickGrid, step: u32, max_dim: u32) {
    let radius = max_dim >> (step - 1);
    if radius == 0 {
        return;
    }

    let dims = grid.dims();
    let snapshot: Vec<_> = grid.handles().to_vec();
    let index = |p: UVec3| -> usize { (p.x + dims.x * p.y + dims.x * dims.y * p.z) as usize };

    for z in 0..dims.z {
        for y in 0..dims.y {
            for x in 0..dims.x {
                let p = UVec3::new(x, y, z);
                let current = snapshot[index(p)];
                let HandleState::Empty { distance: original } = current.classify() else {
                    continue;
                };
                let mut best = original;

                for oz in -1i32..=1 {
                    for oy in -1i32..=1 {
                        for ox in -1i32..=1 {
                            if ox == 0 && oy == 0 && oz == 0 {
                                continue;
                            }
                            let neighbor = p.as_ivec3() + glam::IVec3::new(ox, oy, oz) * radius as i32;
                            if neighbor.x < 0
                                || neighbor.y < 0
                                || neighbor.z < 0
                                || neighbor.x as u32 >= dims.x
                                || neighbor.y as u32 >= dims.y
                                || neighbor.z as u32 >= dims.z
                            {
                                continue;
                            }
                            let neighbor_handle = snapshot[index(neighbor.as_uvec3())];
                            let candidate = match neighbor_handle.classify() {
                                HandleState::Empty { distance } if distance < MAX_DISTANCE => {
                                    (radius as f32) + distance as f32
                                }
                                HandleState::Empty { .. } => continue,
                                HandleState::Data { .. } | HandleState::Lod { .. } | HandleState::Loading => {
                                    radius as f32
                                }
                            };
                            let candidate = candidate.min(MAX_DISTANCE as f32) as u32;
                            best = best.min(candidate);
                        }
                    }
                }

                if best != original {
                    grid.set(p, BrickHandle::encode(HandleState::Empty { distance: best }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick_storage::TraceBrickId;

    #[test]
    fn step_count_matches_ceil_log2_plus_one() {
        assert_eq!(step_count(1), 1);
        assert_eq!(step_count(2), 2);
        assert_eq!(step_count(8), 4);
        assert_eq!(step_count(9), 5);
    }

    #[test]
    fn distance_to_solid_cell_matches_chebyshev_step_count() {
        let mut grid = BrickGrid::new(UVec3::new(8, 8, 8));
        grid.set(
            UVec3::new(4, 4, 4),
            BrickHandle::encode(HandleState::Data {
                trace_brick: TraceBrickId(0),
            }),
        );
        propagate_cpu(&mut grid);

        let HandleState::Empty { distance } = grid.classify(glam::IVec3::new(0, 4, 4)) else {
            panic!("expected empty cell");
        };
        // Chebyshev distance from (0,4,4) to (4,4,4) is 4.
        assert_eq!(distance, 4);
    }

    #[test]
    fn solid_cells_are_never_touched_by_propagation() {
        let mut grid = BrickGrid::new(UVec3::new(4, 4, 4));
        let solid = BrickHandle::encode(HandleState::Data {
            trace_brick: TraceBrickId(1),
        });
        grid.set(UVec3::new(1, 1, 1), solid);
        propagate_cpu(&mut grid);
        assert_eq!(grid.get(glam::IVec3::new(1, 1, 1)), solid);
    }

    #[test]
    fn distances_never_increase_across_a_rerun() {
        let mut grid = BrickGrid::new(UVec3::new(6, 6, 6));
        grid.set(
            UVec3::new(0, 0, 0),
            BrickHandle::encode(HandleState::Data {
                trace_brick: TraceBrickId(0),
            }),
        );
        propagate_cpu(&mut grid);
        let first: Vec<_> = grid.handles().to_vec();
        propagate_cpu(&mut grid);
        let second: Vec<_> = grid.handles().to_vec();
        for (a, b) in first.iter().zip(second.iter()) {
            if let (HandleState::Empty { distance: da }, HandleState::Empty { distance: db }) =
                (a.classify(), b.classify())
            {
                assert!(db <= da);
            }
        }
    }
}
