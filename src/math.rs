/// Maps a 3d index to a 1d index, row-major with x fastest-varying.
#[inline]
pub fn to_1d_index(p: glam::UVec3, dim: glam::UVec3) -> usize {
    (p.x + p.y * dim.x + p.z * dim.x * dim.y) as usize
}
