//! The size and granularity of the Field Of View (FOV) in which images are
//! reconstructed.

use crate::{Lengthf32, Point, Vector};
use crate::index::{index1_to_3, BoxDim_u, Index1_u, Index3_u};

/// Axis-aligned voxel box, centred on the origin.
#[derive(Clone, Copy, Debug)]
pub struct FOV {
    pub half_width: Vector,
    pub n: BoxDim_u,
    pub voxel_size: Vector,
}

impl FOV {

    pub fn new(
        full_size: (Lengthf32, Lengthf32, Lengthf32),
        (nx, ny, nz): (usize, usize, usize),
    ) -> Self {
        let (dx, dy, dz) = full_size;
        let half_width = Vector::new(dx / 2.0, dy / 2.0, dz / 2.0);
        let n = [nx, ny, nz];
        let voxel_size = Self::voxel_size(n, half_width);
        Self { half_width, n, voxel_size }
    }

    fn voxel_size(n: BoxDim_u, half_width: Vector) -> Vector {
        let full_width = half_width * 2.0;
        Vector::new(full_width[0] / n[0] as Lengthf32,
                    full_width[1] / n[1] as Lengthf32,
                    full_width[2] / n[2] as Lengthf32)
    }

    pub fn nvoxels(&self) -> usize { self.n[0] * self.n[1] * self.n[2] }

    /// Find centre of voxel with given 3D index
    pub fn voxel_centre(&self, i: Index3_u) -> Point {
        let s = self.voxel_size;
        Point::new((i[0] as Lengthf32 + 0.5) * s.x - self.half_width[0],
                   (i[1] as Lengthf32 + 0.5) * s.y - self.half_width[1],
                   (i[2] as Lengthf32 + 0.5) * s.z - self.half_width[2])
    }

    /// Find centre of voxel with given 1D index
    pub fn voxel_centre1(&self, i: Index1_u) -> Point {
        self.voxel_centre(index1_to_3(i, self.n))
    }

    /// Point at which the segment from `p1` to `p2` enters the FOV box, if it
    /// hits the box at all. A `p1` inside the box is its own entry point.
    pub fn entry(&self, p1: Point, p2: Point) -> Option<Point> {
        use parry3d::query::{Ray, RayCast};
        use parry3d::shape::Cuboid;

        let lor_length = (p2 - p1).norm();
        if lor_length == 0.0 { return None; }
        let lor: Ray = Ray::new(p1, (p2 - p1) / lor_length);
        Cuboid::new(self.half_width)
            .cast_local_ray(&lor, lor_length, true)
            .map(|toi| lor.point_at(toi))
    }

}

#[cfg(test)]
mod test_fov {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;

    #[rstest(/**/ index,   expected_position,
             case([0,0,0], [-1.0, -1.0, -1.0]),
             case([0,0,1], [-1.0, -1.0,  1.0]),
             case([0,1,0], [-1.0,  1.0, -1.0]),
             case([0,1,1], [-1.0,  1.0,  1.0]),
             case([1,0,0], [ 1.0, -1.0, -1.0]),
             case([1,0,1], [ 1.0, -1.0,  1.0]),
             case([1,1,0], [ 1.0,  1.0, -1.0]),
             case([1,1,1], [ 1.0,  1.0,  1.0]),
    )]
    fn test_voxel_centre(index: Index3_u, expected_position: [Lengthf32; 3]) {
        let fov = FOV::new((4.0, 4.0, 4.0), (2, 2, 2));
        let c = fov.voxel_centre(index);
        assert_float_eq!([c.x, c.y, c.z], expected_position, ulps <= [1, 1, 1]);
    }

    #[test]
    fn test_voxel_pitch_follows_extent_and_count() {
        let fov = FOV::new((180.0, 120.0, 90.0), (60, 40, 45));
        assert_float_eq!(fov.voxel_size.x, 3.0, ulps <= 1);
        assert_float_eq!(fov.voxel_size.y, 3.0, ulps <= 1);
        assert_float_eq!(fov.voxel_size.z, 2.0, ulps <= 1);
        assert_eq!(fov.nvoxels(), 60 * 40 * 45);
    }

    #[test]
    fn test_entry_point_on_box_surface() {
        let fov = FOV::new((20.0, 20.0, 20.0), (5, 5, 5));
        let p1 = Point::new(-50.0, 0.0, 0.0);
        let p2 = Point::new( 50.0, 0.0, 0.0);
        let entry = fov.entry(p1, p2).unwrap();
        assert_float_eq!([entry.x, entry.y, entry.z], [-10.0, 0.0, 0.0], abs <= [1e-4; 3]);
    }

    #[test]
    fn test_lor_that_misses_the_box() {
        let fov = FOV::new((20.0, 20.0, 20.0), (5, 5, 5));
        let p1 = Point::new(-50.0, 30.0, 0.0);
        let p2 = Point::new( 50.0, 30.0, 0.0);
        assert!(fov.entry(p1, p2).is_none());
    }
}
