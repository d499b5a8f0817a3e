use glam::{IVec3, Mat4, UVec3, Vec3, Vec4};

use crate::brick_grid::BrickGrid;
use crate::brick_handle::{HandleState, MAX_DISTANCE};
use crate::brick_storage::{BrickStorage, TraceBrickId, BRICK_EDGE};
use crate::dda::{aabb_intersect, fix_degenerate, Axis, Dda};
use crate::material::{MaterialId, MaterialTable, PaletteOffset, PaletteTable};

/// Per-dispatch camera and budget parameters.
#[derive(Debug, Clone, Copy)]
pub struct RayTraceParams {
    pub inverse_view_proj: Mat4,
    pub camera_pos: Vec3,
    pub viewport: (u32, u32),
    pub max_ray_steps: u32,
}

/// The four images one pixel contributes to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelOutput {
    pub albedo: Vec4,
    pub depth: f32,
    pub normal: Vec4,
    pub intensity: f32,
}

fn miss(intensity: f32) -> PixelOutput {
    PixelOutput {
        albedo: Vec4::ZERO,
        depth: 1.0,
        normal: Vec4::ZERO,
        intensity,
    }
}

fn intensity_for_steps(steps: u32, max_ray_steps: u32) -> f32 {
    (steps as f32 / (6.0 * max_ray_steps as f32)).clamp(0.0, 1.0).sqrt()
}

fn unproject(inverse_view_proj: Mat4, ndc_x: f32, ndc_y: f32, ndc_z: f32) -> Vec3 {
    let clip = Vec4::new(ndc_x, ndc_y, ndc_z, 1.0);
    let world = inverse_view_proj * clip;
    world.truncate() / world.w
}

/// Six-way face palette: which color a step along `axis`, opposing
/// `ray_dir`, paints. The face a ray enters always has a normal pointing
/// back along `-sign(ray_dir)` on the stepped axis.
fn face_color(axis: Axis, ray_dir: Vec3) -> Vec4 {
    let (neg_face, pos_face) = match axis {
        Axis::X => ([0.0, 1.0, 1.0, 1.0], [1.0, 0.0, 0.0, 1.0]),
        Axis::Y => ([1.0, 0.0, 1.0, 1.0], [0.0, 1.0, 0.0, 1.0]),
        Axis::Z => ([1.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]),
    };
    let sign = match axis {
        Axis::X => ray_dir.x,
        Axis::Y => ray_dir.y,
        Axis::Z => ray_dir.z,
    };
    Vec4::from(if sign > 0.0 { neg_face } else { pos_face })
}

struct RaySetup {
    origin: Vec3,
    dir: Vec3,
}

fn setup_ray(params: &RayTraceParams, px: u32, py: u32) -> RaySetup {
    let (w, h) = params.viewport;
    let ndc_x = (px as f32 + 0.5) / w as f32 * 2.0 - 1.0;
    let ndc_y = 1.0 - (py as f32 + 0.5) / h as f32 * 2.0;
    let near = unproject(params.inverse_view_proj, ndc_x, ndc_y, -1.0);
    let far = unproject(params.inverse_view_proj, ndc_x, ndc_y, 1.0);
    let dir = fix_degenerate((far - near).normalize());
    RaySetup {
        origin: params.camera_pos,
        dir,
    }
}

/// Traces the ray entering a solid brick at `entry_local` (brick-local
/// `[0, 8)` coordinates) against its occupancy bitmap, returning the hit
/// color, local cell, and stepped axis.
fn inner_dda(
    storage: &BrickStorage,
    materials: &MaterialTable,
    palettes: &PaletteTable,
    trace_brick_id: TraceBrickId,
    entry_local: Vec3,
    dir: Vec3,
) -> Option<(Vec4, IVec3, Axis)> {
    let trace_brick = storage.trace_brick(trace_brick_id);
    let mut dda = Dda::new(entry_local, dir);
    let mut axis = Axis::Z;

    // A brick is only 8 cells wide; a diagonal ray can never cross more
    // than 3*8 boundaries inside it, so this bound is generous, not tight.
    for _ in 0..(3 * BRICK_EDGE as i32) {
        let edge = BRICK_EDGE as i32;
        if dda.map.x < 0 || dda.map.x >= edge || dda.map.y < 0 || dda.map.y >= edge || dda.map.z < 0 || dda.map.z >= edge {
            return None;
        }
        let local = dda.map.as_uvec3();
        if trace_brick.is_occupied(local) {
            let palette_index = storage.read_voxel(trace_brick_id, local);
            let material_id = palettes.palette_entry(PaletteOffset(trace_brick.palette), palette_index);
            let material = materials.material(MaterialId(material_id));
            return Some((Vec4::from(material.color), dda.map, axis));
        }
        axis = dda.step();
    }
    None
}

/// Traces one pixel's ray through the brickmap: world-box clip, outer grid
/// DDA with SDF fast-skip, and an inner brick DDA on a `Data` hit.
pub fn trace_pixel_cpu(
    grid: &BrickGrid,
    storage: &BrickStorage,
    materials: &MaterialTable,
    palettes: &PaletteTable,
    params: &RayTraceParams,
    px: u32,
    py: u32,
) -> PixelOutput {
    let RaySetup { origin, dir } = setup_ray(params, px, py);
    trace_ray_cpu(grid, storage, materials, palettes, origin, dir, params.max_ray_steps)
}

/// Core two-level DDA, parameterized over an already-computed ray so tests
/// can exercise exact scenarios without reverse-engineering a projection.
fn trace_ray_cpu(
    grid: &BrickGrid,
    storage: &BrickStorage,
    materials: &MaterialTable,
    palettes: &PaletteTable,
    origin: Vec3,
    dir: Vec3,
    max_ray_steps: u32,
) -> PixelOutput {
    let dir = fix_degenerate(dir);
    let dims = grid.dims();
    let grid_dims_f = dims.as_vec3();

    let Some((t_near, _)) = aabb_intersect(origin, dir, Vec3::ZERO, grid_dims_f) else {
        return miss(0.0);
    };

    let mut current_t = t_near.max(0.0);
    // `dda.side` is always local to the position the live `Dda` was built
    // from, not an absolute distance from `origin`; `t_base` is that
    // position's distance so `current_t` can be rebased off it. `grid_entry`
    // is the fixed point where the ray crosses into the grid, the reference
    // depth is measured from.
    let mut t_base = current_t;
    let grid_entry = origin + dir * current_t;
    let mut dda = Dda::new(origin + dir * current_t, dir);
    let mut steps: u32 = 0;

    loop {
        if steps >= max_ray_steps {
            return miss(intensity_for_steps(steps, max_ray_steps));
        }
        if out_of_bounds(dda.map, dims) {
            return miss(intensity_for_steps(steps, max_ray_steps));
        }
        steps += 1;

        match grid.classify(dda.map) {
            HandleState::Data { trace_brick } => {
                let entry_world = origin + dir * current_t;
                let brick_min = dda.map.as_vec3();
                let local = ((entry_world - brick_min) * BRICK_EDGE as f32)
                    .clamp(Vec3::splat(1e-4), Vec3::splat(BRICK_EDGE as f32 - 1e-4));
                if let Some((color, local_hit, axis)) = inner_dda(storage, materials, palettes, trace_brick, local, dir) {
                    let hit_world = brick_min + local_hit.as_vec3() / BRICK_EDGE as f32;
                    return PixelOutput {
                        albedo: color,
                        depth: (hit_world - grid_entry).length() / grid_dims_f.length(),
                        normal: face_color(axis, dir),
                        intensity: intensity_for_steps(steps, max_ray_steps),
                    };
                }
                // Inner traversal found nothing occupied; fall through and
                // keep stepping the outer grid.
            }
            HandleState::Lod { material } => {
                // A LOD cell has no finer surface; sample depth at the
                // cell's midpoint along the ray, half a unit past the entry
                // face.
                let hit_world = origin + dir * (current_t + 0.5);
                let axis = dda.next_axis();
                return PixelOutput {
                    albedo: Vec4::from(materials.material(material).color),
                    depth: (hit_world - grid_entry).length() / grid_dims_f.length(),
                    normal: face_color(axis, dir),
                    intensity: intensity_for_steps(steps, max_ray_steps),
                };
            }
            HandleState::Loading => {
                grid.mark_seen(dda.map.as_uvec3());
            }
            HandleState::Empty { distance } if distance > 1 && distance < MAX_DISTANCE => {
                current_t += (distance - 1) as f32;
                t_base = current_t;
                dda = Dda::new(origin + dir * current_t, dir);
                continue;
            }
            HandleState::Empty { .. } => {}
        }

        grid.mark_seen(dda.map.as_uvec3());
        let axis = dda.next_axis();
        current_t = t_base
            + match axis {
                Axis::X => dda.side.x,
                Axis::Y => dda.side.y,
                Axis::Z => dda.side.z,
            };
        dda.step();
    }
}

fn out_of_bounds(p: IVec3, dims: UVec3) -> bool {
    p.x < 0 || p.y < 0 || p.z < 0 || p.x as u32 >= dims.x || p.y as u32 >= dims.y || p.z as u32 >= dims.z
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::brick_grid::BrickGrid;
    use crate::brick_handle::{BrickHandle, HandleState};
    use crate::brick_storage::{BitsPerVoxel, BrickStorage, BRICK_VOLUME};
    use crate::material::{Material, MaterialTable, PaletteTable};

    #[test]
    fn empty_grid_ray_is_a_miss() {
        let grid = BrickGrid::new(UVec3::new(2, 2, 2));
        let storage = BrickStorage::new(64);
        let materials = MaterialTable::new(4);
        let palettes = PaletteTable::new(64);

        let origin = Vec3::new(-5.0, 1.0, 1.0);
        let dir = Vec3::X;
        let out = trace_ray_cpu(&grid, &storage, &materials, &palettes, origin, dir, 256);
        assert_eq!(out.albedo, Vec4::ZERO);
        assert_eq!(out.depth, 1.0);
    }

    #[test]
    fn lod_cell_is_hit_directly() {
        let mut grid = BrickGrid::new(UVec3::new(2, 2, 2));
        let mut materials = MaterialTable::new(4);
        let storage = BrickStorage::new(64);
        let palettes = PaletteTable::new(64);

        let material = materials
            .intern_material(Material::new([0.3, 0.6, 0.9, 1.0], [0.0; 3], 1.0, 0.0, 0.5))
            .unwrap();
        grid.set(UVec3::new(1, 1, 1), BrickHandle::encode(HandleState::Lod { material }));

        let origin = Vec3::new(-5.0, 1.0, 1.0);
        let dir = Vec3::X;
        let out = trace_ray_cpu(&grid, &storage, &materials, &palettes, origin, dir, 256);
        assert_eq!(out.albedo, Vec4::new(0.3, 0.6, 0.9, 1.0));
        // depth ≈ length((1.5,0,0)) / length((2,2,2)): the LOD cell's
        // midpoint along the ray, relative to where the ray entered the grid.
        assert_relative_eq!(out.depth, 1.5 / 12f32.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn sdf_fast_skip_reaches_solid_cell_in_few_outer_steps() {
        let mut grid = BrickGrid::new(UVec3::new(16, 16, 16));
        let mut materials = MaterialTable::new(4);
        let mut storage = BrickStorage::new(4096);
        let mut palettes = PaletteTable::new(64);

        let material = materials
            .intern_material(Material::new([1.0, 0.0, 0.0, 1.0], [0.0; 3], 1.0, 0.0, 0.5))
            .unwrap();
        let palette = palettes.intern_palette(&[material.0]).unwrap();
        let mut voxels = [0u32; BRICK_VOLUME];
        voxels[4 * 8 + 4 * 64] = 1; // local (0, 4, 4): faces the ray entering along -x
        let (trace_brick, _) = storage.write_brick(palette, BitsPerVoxel::One, &voxels).unwrap();
        grid.set(UVec3::new(15, 8, 8), BrickHandle::encode(HandleState::Data { trace_brick }));

        crate::sdf::propagate_cpu(&mut grid);

        let HandleState::Empty { distance } = grid.classify(IVec3::new(0, 8, 8)) else {
            panic!("expected empty start cell");
        };
        assert!(distance >= 14, "fast skip requires a distance >= 14, got {distance}");

        let origin = Vec3::new(-1.0, 8.5, 8.5);
        let dir = Vec3::X;
        let max_ray_steps = 256;
        let out = trace_ray_cpu(&grid, &storage, &materials, &palettes, origin, dir, max_ray_steps);
        assert_eq!(out.albedo, Vec4::new(1.0, 0.0, 0.0, 1.0), "fast-skipped ray should hit the brick");

        let recovered_steps = (out.intensity.powi(2) * 6.0 * max_ray_steps as f32).round();
        assert!(
            recovered_steps <= 3.0,
            "fast skip should reach the brick in <= 3 outer DDA iterations, got {recovered_steps}"
        );
    }

    #[test]
    fn inner_dda_hits_single_occupied_voxel() {
        let mut materials = MaterialTable::new(4);
        let mut storage = BrickStorage::new(4096);
        let mut palettes = PaletteTable::new(64);

        let material = materials
            .intern_material(Material::new([0.2, 0.8, 0.2, 1.0], [0.0; 3], 1.0, 0.0, 0.5))
            .unwrap();
        let palette = palettes.intern_palette(&[material.0]).unwrap();
        let mut voxels = [0u32; BRICK_VOLUME];
        voxels[4 + 8 * 4 + 64 * 4] = 1;
        let (trace_brick, _) = storage.write_brick(palette, BitsPerVoxel::One, &voxels).unwrap();

        let hit = inner_dda(
            &storage,
            &materials,
            &palettes,
            trace_brick,
            Vec3::new(4.5, 4.5, 0.01),
            Vec3::Z,
        );
        let (color, local, _axis) = hit.expect("ray through the voxel column should hit");
        assert_eq!(color, Vec4::new(0.2, 0.8, 0.2, 1.0));
        assert_eq!(local, IVec3::new(4, 4, 4));
    }

    #[test]
    fn trace_pixel_cpu_misses_empty_grid_through_projection() {
        let grid = BrickGrid::new(UVec3::new(4, 4, 4));
        let storage = BrickStorage::new(64);
        let materials = MaterialTable::new(4);
        let palettes = PaletteTable::new(64);

        let eye = Vec3::new(-6.0, 2.0, 2.0);
        let view = Mat4::look_at_rh(eye, Vec3::new(2.0, 2.0, 2.0), Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 100.0);
        let inverse_view_proj = (proj * view).inverse();

        let params = RayTraceParams {
            inverse_view_proj,
            camera_pos: eye,
            viewport: (32, 32),
            max_ray_steps: 256,
        };

        let out = trace_pixel_cpu(&grid, &storage, &materials, &palettes, &params, 16, 16);
        assert_eq!(out.albedo, Vec4::ZERO);
        assert_eq!(out.depth, 1.0);
    }
}
