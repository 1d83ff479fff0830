//! Find the weights and indices of the voxels coupled to a single Line Of
//! Response (LOR).
//!
//! The traversal is centred around two key simplifications:
//!
//! 1. Express the voxel size in terms of the components of the LOR's direction
//!    vector. This allows trivial calculation of how far we must move along the
//!    LOR before reaching a voxel boundary, in any dimension.
//!
//! 2. Exploit symmetry to simplify dealing with directions: flip axes so that
//!    the direction of the LOR has non-negative components. The algorithm can
//!    then assume that all progress is in the positive direction. Any voxel
//!    indices calculated by the algorithm must be flipped back to the original
//!    coordinate system.
//!
//! The weight of a voxel is the length of the LOR's chord inside it, so only
//! voxels actually crossed by the line carry a non-zero weight; with TOF
//! enabled the chord length is further modulated by a Gaussian centred on the
//! position along the LOR implied by the timing difference.

use core::fmt;

use crate::{C, Lengthf32, Point, Timef32, Vector, Weightf32};
use crate::error::{Error, Result};
use crate::fov::FOV;
use crate::gauss::{make_gauss_option, Tof};
use crate::index::{index1_to_3, Index1_u, Index3_u};

/// Line Of Response.
///
/// 2 spacetime vectors indicating the positions and times of coincident
/// detector element activations. Positions in mm, times in ps.
#[derive(Clone, Copy, Debug)]
#[allow(clippy::upper_case_acronyms)]
pub struct LOR {
    pub p1: Point,
    pub p2: Point,
    pub dt: Timef32,
}

impl LOR {
    pub fn new(t1: Timef32, t2: Timef32, p1: Point, p2: Point) -> Self {
        Self { p1, p2, dt: t2 - t1 }
    }

    pub fn from_components((t1, t2): (Timef32, Timef32),
                           (x1, y1, z1): (Lengthf32, Lengthf32, Lengthf32),
                           (x2, y2, z2): (Lengthf32, Lengthf32, Lengthf32),
    ) -> Self {
        Self::new(t1, t2, Point::new(x1, y1, z1), Point::new(x2, y2, z2))
    }

    /// Build LORs from the eight equal-length coordinate arrays of the
    /// columnar list-mode layout. Mismatched lengths are rejected before any
    /// LOR is constructed.
    pub fn batch_from_components(
        (x1, y1, z1, t1): (&[Lengthf32], &[Lengthf32], &[Lengthf32], &[Timef32]),
        (x2, y2, z2, t2): (&[Lengthf32], &[Lengthf32], &[Lengthf32], &[Timef32]),
    ) -> Result<Vec<LOR>> {
        let expected = x1.len();
        for (component, found) in [("y1", y1.len()), ("z1", z1.len()), ("t1", t1.len()),
                                   ("x2", x2.len()), ("y2", y2.len()), ("z2", z2.len()),
                                   ("t2", t2.len())] {
            if found != expected {
                return Err(Error::MismatchedLorComponents { component, expected, found });
            }
        }
        Ok((0..expected)
           .map(|i| LOR::from_components((t1[i], t2[i]),
                                         (x1[i], y1[i], z1[i]),
                                         (x2[i], y2[i], z2[i])))
           .collect())
    }
}

impl fmt::Display for LOR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (p, q) = (self.p1, self.p2);
        write!(f, "<LOR ({:8.2} {:8.2} {:8.2}) ({:8.2} {:8.2} {:8.2}) {:7.2}ps {:7.2}mm /{:7.2} >",
               p.x, p.y, p.z,
               q.x, q.y, q.z,
               self.dt, self.dt * C / 2.0,
               (p - q).norm())
    }
}

// --------------------------------------------------------------------------------

/// Data needed to trace a LOR through the voxels of the FOV, derived from the
/// point at which the LOR enters it.
pub struct FovHit {

    /// Distance along the LOR from the entry point to the next voxel boundary,
    /// in each dimension.
    pub next_boundary: Vector,

    /// Voxel size expressed in LOR distance units: how far we must move along
    /// the LOR to cross one voxel, in any given dimension. Infinite for any
    /// axis which is parallel to the LOR.
    pub voxel_size: Vector,

    /// 1D index of the voxel in which the LOR enters the FOV.
    pub index: i32,

    /// Change of 1D index induced by crossing a voxel boundary, per dimension.
    pub delta_index: [i32; 3],

    /// Number of voxel boundaries left to cross, per dimension, before the LOR
    /// leaves the FOV.
    pub remaining: [i32; 3],

    /// Distance along the LOR from the entry point to the TOF peak.
    pub tof_peak: Lengthf32,
}

/// Analyse the LOR's passage through the FOV; `None` if it misses.
pub fn lor_fov_hit(lor: &LOR, fov: FOV) -> Option<FovHit> {

    // Simplify the traversal by flipping axes so that the direction from p1 to
    // p2 is non-negative along all axes. Remember which directions have been
    // flipped, to recover correct voxel indices.
    let (p1, p2, flipped) = flip_axes(lor.p1, lor.p2);

    // If and where the LOR enters the FOV (mirroring the box onto itself, so
    // the flipped coordinates see the same box).
    let entry_point: Point = fov.entry(p1, p2)?;

    // Distance from entry point to the TOF peak
    let tof_peak = find_tof_peak(entry_point, p1, p2, lor.dt);

    // Express the entry point in voxel coordinates: floor(position) = index
    let entry_point = find_entry_point(entry_point, fov);

    // Bookkeeping for the boundary-crossing walk
    let voxel_size = voxel_size_along_lor(fov, p1, p2);
    let next_boundary = first_boundaries(entry_point, voxel_size);
    let (index, delta_index, remaining) = indices(entry_point, fov, flipped);

    Some(FovHit { next_boundary, voxel_size, index, delta_index, remaining, tof_peak })
}

fn flip_axes(mut p1: Point, mut p2: Point) -> (Point, Point, [bool; 3]) {
    let original_lor_direction: Vector = p2 - p1;
    let mut flipped = [false; 3];
    for d in 0..3 {
        if original_lor_direction[d] < 0.0 {
            p1[d] = -p1[d];
            p2[d] = -p2[d];
            flipped[d] = true;
        }
    }
    (p1, p2, flipped)
}

const EPS: Lengthf32 = 1e-5;

/// The point at which the LOR enters the FOV, expressed in a coordinate
/// system with one corner of the FOV at the origin and voxel-sized units.
#[inline]
fn find_entry_point(entry_point: Point, fov: FOV) -> Point {
    // Transform coordinates to align the box with the axes: making the lower
    // boundaries of the box lie on the zero-planes.
    let mut entry = (entry_point + fov.half_width).coords
        .component_div(&fov.voxel_size);

    // Floating-point subtractions which should give zero usually miss very
    // slightly: if this error is negative, the next step (which uses floor)
    // will pick the wrong voxel. Work around this problem by assuming that
    // anything very close to zero is exactly zero.
    entry.iter_mut().for_each(|x| if x.abs() < EPS { *x = 0.0 });
    Point::from(entry)
}

/// Distance from the entry point to the LOR's TOF peak
#[inline]
fn find_tof_peak(entry_point: Point, p1: Point, p2: Point, dt: Timef32) -> Lengthf32 {
    let half_lor_length = (p1 - p2).norm() / 2.0;
    let tof_shift = C * dt / 2.0; // NOTE ignoring refractive index
    let p1_to_peak = half_lor_length - tof_shift;
    let p1_to_entry = (entry_point - p1).norm();
    p1_to_peak - p1_to_entry
}

/// Distances from the entry point to the next voxel boundary, in each dimension
#[inline]
fn first_boundaries(entry_point: Point, voxel_size: Vector) -> Vector {
    // How far we have penetrated into the entry voxel, along each axis
    let frac_done: Vector = entry_point.coords - entry_point.coords.map(|x| x.floor());
    // Distances remaining to the nearest boundaries
    (Vector::repeat(1.0) - frac_done).component_mul(&voxel_size)
}

/// Voxel size expressed in LOR distance units: how far we must move along the
/// LOR to cross one voxel in any given dimension. Infinite for axes parallel
/// to the LOR.
#[inline]
fn voxel_size_along_lor(fov: FOV, p1: Point, p2: Point) -> Vector {
    // Canonicalize -0.0 direction components: dividing by -0.0 would give
    // -inf and derail the boundary walk
    let lor_direction = (p2 - p1).normalize().map(|x| if x == 0.0 { 0.0 } else { x });
    fov.voxel_size.component_div(&lor_direction)
}

/// 1D index of the entry voxel, the 1D index increment per boundary crossing
/// in each dimension, and the number of crossings remaining per dimension.
/// The index arithmetic undoes the axis flips, so the emitted indices live in
/// the original coordinate system.
fn indices(entry_point: Point, fov: FOV, flipped: [bool; 3]) -> (i32, [i32; 3], [i32; 3]) {
    let [nx, ny, _nz] = fov.n;
    let strides = [1, nx as i32, (nx * ny) as i32];
    let mut index = 0;
    let mut delta_index = [0; 3];
    let mut remaining = [0; 3];
    for d in 0..3 {
        let n = fov.n[d] as i32;
        // Index of the entry voxel along this axis, in flipped coordinates
        let i = (entry_point[d].floor() as i32).clamp(0, n - 1);
        let true_i = if flipped[d] { n - 1 - i } else { i };
        index += true_i * strides[d];
        delta_index[d] = if flipped[d] { -strides[d] } else { strides[d] };
        remaining[d] = n - i;
    }
    (index, delta_index, remaining)
}

/// For a single LOR, place the weights and 1D indices of the coupled voxels in
/// the `weights` and `indices` parameters. Output parameters rather than
/// return values: this function runs in the inner loop, and allocating the
/// result vectors anew for each LOR had a noticeable runtime cost.
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn system_matrix_elements(
    indices: &mut Vec<Index1_u>,
    weights: &mut Vec<Weightf32>,
    mut next_boundary: Vector,
    voxel_size: Vector,
    mut index: i32,
    delta_index: [i32; 3],
    mut remaining: [i32; 3],
    tof_peak: Lengthf32,
    tof: &Option<impl Fn(Lengthf32) -> Lengthf32>,
) {
    // How far we have moved since entering the FOV
    let mut here: Lengthf32 = 0.0;

    loop {
        // Which voxel boundary will be hit next, and its position
        let (dimension, boundary_position) = next_boundary.argmin();

        // The weight is the length of LOR in this voxel
        let mut weight = boundary_position - here;

        // If TOF enabled, adjust weight
        if let Some(gauss) = &tof {
            weight *= gauss(here - tof_peak);
        }

        // Store the index and weight of the voxel we have just crossed
        if weight > 0.0 {
            indices.push(index as Index1_u);
            weights.push(weight);
        }

        // Move along LOR until it leaves this voxel
        here = boundary_position;

        // Find the next boundary in this dimension
        next_boundary[dimension] += voxel_size[dimension];

        // Move index across the boundary we are crossing
        index += delta_index[dimension];
        remaining[dimension] -= 1;

        // If we have traversed the whole FOV, we're finished
        if remaining[dimension] == 0 { break; }
    }
}

// --------------------------------------------------------------------------------

pub type SystemMatrixElement = (Index3_u, Weightf32);

/// The non-zero elements of the system-matrix row associated with one LOR:
/// the voxels the LOR couples to, with their weights.
pub struct SystemMatrixRow(pub Vec<SystemMatrixElement>);

impl SystemMatrixRow {
    pub fn new(lor: &LOR, fov: &FOV, tof: Option<Tof>) -> Self {
        let tof = make_gauss_option(tof);
        let mut weights = vec![];
        let mut indices = vec![];
        if let Some(FovHit { next_boundary, voxel_size, index, delta_index, remaining, tof_peak })
            = lor_fov_hit(lor, *fov)
        {
            system_matrix_elements(
                &mut indices, &mut weights,
                next_boundary, voxel_size,
                index, delta_index, remaining,
                tof_peak, &tof,
            );
        }
        SystemMatrixRow(indices.into_iter()
                        .map(|i| index1_to_3(i, fov.n))
                        .zip(weights)
                        .collect())
    }

    pub fn iter(&self) -> std::slice::Iter<SystemMatrixElement> { self.0.iter() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl IntoIterator for SystemMatrixRow {
    type Item = SystemMatrixElement;
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

// ------------------------------ TESTS ------------------------------
