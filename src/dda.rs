use glam::{IVec3, Vec3};

/// Axis an Amanatides-Woo step advanced along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

fn signum(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Shared integer-lattice stepper for the outer grid traversal and the
/// inner brick traversal: same recurrence, different lattice scale.
#[derive(Debug, Clone, Copy)]
pub struct Dda {
    pub map: IVec3,
    pub side: Vec3,
    delta: Vec3,
    ray_sign: IVec3,
}

impl Dda {
    pub fn new(pos: Vec3, dir: Vec3) -> Self {
        let map = pos.floor().as_ivec3();
        let ray_sign = IVec3::new(signum(dir.x), signum(dir.y), signum(dir.z));
        let delta = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let side = (map.as_vec3() - pos + Vec3::splat(0.5) + ray_sign.as_vec3() * 0.5) * delta;
        Self {
            map,
            side,
            delta,
            ray_sign,
        }
    }

    /// The axis `step` would advance next, without mutating state. Ties are
    /// broken z, then x, then y.
    pub fn next_axis(&self) -> Axis {
        let mut axis = Axis::Z;
        let mut best = self.side.z;
        if self.side.x < best {
            axis = Axis::X;
            best = self.side.x;
        }
        if self.side.y < best {
            axis = Axis::Y;
        }
        axis
    }

    /// Advances `map` by one cell along the next axis and returns it.
    /// `side`'s increment uses `|delta|`: `delta`'s sign only matters for
    /// the initial boundary distance computed in `new`.
    pub fn step(&mut self) -> Axis {
        let axis = self.next_axis();
        match axis {
            Axis::X => {
                self.map.x += self.ray_sign.x;
                self.side.x += self.delta.x.abs();
            }
            Axis::Y => {
                self.map.y += self.ray_sign.y;
                self.side.y += self.delta.y.abs();
            }
            Axis::Z => {
                self.map.z += self.ray_sign.z;
                self.side.z += self.delta.z.abs();
            }
        }
        axis
    }
}

/// Replaces a direction's exactly-zero components with a small epsilon so
/// `1/dir` never divides by zero. Not renormalized: the nudge is meant to
/// be numerically invisible, not a corrected direction.
pub fn fix_degenerate(dir: Vec3) -> Vec3 {
    const EPS: f32 = 1e-6;
    Vec3::new(
        if dir.x == 0.0 { EPS } else { dir.x },
        if dir.y == 0.0 { EPS } else { dir.y },
        if dir.z == 0.0 { EPS } else { dir.z },
    )
}

/// Ray/axis-aligned-box intersection via the slab method. Returns
/// `(t_near, t_far)`, or `None` on a miss.
pub fn aabb_intersect(origin: Vec3, dir: Vec3, bmin: Vec3, bmax: Vec3) -> Option<(f32, f32)> {
    let inv_dir = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
    let t0 = (bmin - origin) * inv_dir;
    let t1 = (bmax - origin) * inv_dir;
    let tmin = t0.min(t1);
    let tmax = t0.max(t1);
    let t_near = tmin.x.max(tmin.y).max(tmin.z);
    let t_far = tmax.x.min(tmax.y).min(tmax.z);
    if t_near > t_far || t_far < 0.0 {
        None
    } else {
        Some((t_near, t_far))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn aabb_intersect_hits_straight_on_ray() {
        let hit = aabb_intersect(Vec3::new(-5.0, 1.0, 1.0), Vec3::X, Vec3::ZERO, Vec3::splat(2.0));
        let (t_near, t_far) = hit.unwrap();
        assert_relative_eq!(t_near, 5.0, epsilon = 1e-5);
        assert_relative_eq!(t_far, 7.0, epsilon = 1e-5);
    }

    #[test]
    fn aabb_intersect_misses_parallel_ray_outside_box() {
        let hit = aabb_intersect(Vec3::new(-5.0, 10.0, 1.0), Vec3::X, Vec3::ZERO, Vec3::splat(2.0));
        assert!(hit.is_none());
    }

    #[test]
    fn dda_steps_toward_positive_axis() {
        let mut dda = Dda::new(Vec3::new(0.1, 1.5, 1.5), fix_degenerate(Vec3::X));
        assert_eq!(dda.map, IVec3::new(0, 1, 1));
        let axis = dda.step();
        assert_eq!(axis, Axis::X);
        assert_eq!(dda.map, IVec3::new(1, 1, 1));
    }
}
