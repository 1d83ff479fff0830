//! Conversion between 1D and 3D voxel indices.
//!
//! Images are stored as flat arrays with x varying fastest, then y, then z:
//! `ivox = i + nx * (j + ny * k)`.

use std::ops::{Add, Div, Mul, Rem};

#[allow(non_camel_case_types)] pub type Index1_u = usize;
#[allow(non_camel_case_types)] pub type Index3_u = [usize; 3];
#[allow(non_camel_case_types)] pub type BoxDim_u = [usize; 3];

pub fn index3_to_1<T>([ix, iy, iz]: [T; 3], [nx, ny, _nz]: [T; 3]) -> T
where
    T: Mul<Output = T> + Add<Output = T>
{
    ix + nx * (iy + ny * iz)
}

#[allow(clippy::many_single_char_names)]
pub fn index1_to_3<T>(i: T, [nx, ny, _nz]: [T; 3]) -> [T; 3]
where
    T: Mul<Output = T> + Div<Output = T> + Rem<Output = T> + Copy
{
    let z = i / (nx * ny);
    let r = i % (nx * ny);
    let y = r / nx;
    let x = r % nx;
    [x, y, z]
}

#[cfg(test)]
mod test_index_conversion {
    use super::*;
    use rstest::rstest;

    #[rstest(/**/    size   , index3 , index1,
             // degenerate single-axis grids
             case([ 1, 1, 1], [0,0,0],    0),
             case([ 7, 1, 1], [5,0,0],    5),
             case([ 1, 6, 1], [0,2,0],    2),
             case([ 1, 1, 5], [0,0,4],    4),
             // x varies fastest, z slowest
             case([ 3, 3, 3], [1,0,0],    1),
             case([ 3, 3, 3], [0,1,0],    3),
             case([ 3, 3, 3], [0,0,1],    9),
             case([ 3, 3, 3], [2,2,2],   26),
             // powers of ten make the digit reversal visible
             case([10,10,10], [4,5,6],  654),
             case([10,10,10], [9,0,3],  309),
    )]
    fn hand_picked(size: Index3_u, index3: Index3_u, index1: usize) {
        assert_eq!(index3_to_1(index3, size), index1);
        assert_eq!(index1_to_3(index1, size), index3);
    }

    use proptest::prelude::*;

    // A strategy picking grid dimensions along with a 1D index guaranteed to
    // lie inside the grid.
    fn size_and_in_range_index() -> impl Strategy<Value = (Index3_u, usize)> {
        [1..150_usize, 1..150_usize, 1..150_usize]
            .prop_flat_map(|n| (Just(n), 0..(n[0] * n[1] * n[2])))
    }

    proptest! {
        #[test]
        fn index_roundtrip((size, index) in size_and_in_range_index()) {
            let there = index1_to_3(index, size);
            let back  = index3_to_1(there, size);
            assert_eq!(back, index)
        }
    }
}
