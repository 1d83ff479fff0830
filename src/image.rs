//! The voxelized activity-density estimate, and its raw-file form.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::Intensityf32;
use crate::error::{Error, Result};
use crate::fov::FOV;
use crate::index::{index3_to_1, Index1_u, Index3_u};
use crate::io;

pub type ImageData = Vec<Intensityf32>;

#[derive(Clone)]
pub struct Image {
    pub fov: FOV,
    pub data: ImageData,
}

impl Image {

    pub fn new(fov: FOV, data: ImageData) -> Result<Self> {
        let expected = fov.nvoxels();
        if data.len() != expected {
            return Err(Error::ImageShape { expected, found: data.len() });
        }
        Ok(Image { fov, data })
    }

    pub fn ones(fov: FOV) -> Self {
        Self { data: vec![1.0; fov.nvoxels()], fov }
    }

    pub fn empty(fov: FOV) -> Self {
        Self { data: vec![0.0; fov.nvoxels()], fov }
    }

    /// Uniform starting estimate, excluding the voxels the detector cannot
    /// see: where the sensitivity is zero there is no data to update the
    /// estimate with, so those voxels are pinned to zero from the start.
    pub fn initial_estimate(fov: FOV, sensitivity: &Self) -> Self {
        let data = sensitivity.data.iter()
            .map(|&s| if s > 0.0 { 1.0 } else { 0.0 })
            .collect();
        Self { fov, data }
    }

    /// Reload an image with known dimensions (e.g. a checkpoint) from a raw
    /// file of little-endian f32s in x-fastest order.
    ///
    /// The file's byte length is checked against the grid before anything is
    /// read, so a truncated or oversized file can never produce a
    /// partially-filled image.
    pub fn from_raw_file(path: &Path, fov: FOV) -> Result<Self> {
        let expected = 4 * fov.nvoxels() as u64;
        let found = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        if found != expected {
            return Err(Error::SizeMismatch { path: path.to_path_buf(), expected, found });
        }
        let data = io::raw::read(path)?.collect::<std::io::Result<_>>()?;
        Self::new(fov, data)
    }

    /// Write the image as raw little-endian f32s in x-fastest order.
    pub fn write_to_raw_file(&self, path: &Path) -> Result<()> {
        io::raw::write(self.data.iter().copied(), path)?;
        Ok(())
    }
}

impl core::ops::IndexMut<Index1_u> for Image {
    #[inline]
    fn index_mut(&mut self, i: Index1_u) -> &mut Self::Output { &mut self.data[i] }
}

impl core::ops::Index<Index1_u> for Image {
    type Output = Intensityf32;
    #[inline]
    fn index(&self, i: Index1_u) -> &Self::Output { &self.data[i] }
}

impl core::ops::IndexMut<Index3_u> for Image {
    fn index_mut(&mut self, i3: Index3_u) -> &mut Self::Output {
        let i1 = index3_to_1(i3, self.fov.n);
        &mut self.data[i1]
    }
}

impl core::ops::Index<Index3_u> for Image {
    type Output = Intensityf32;
    fn index(&self, i3: Index3_u) -> &Self::Output {
        let i1 = index3_to_1(i3, self.fov.n);
        &self.data[i1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn small_fov() -> FOV { FOV::new((30.0, 30.0, 30.0), (3, 3, 3)) }

    #[test]
    fn indexing_follows_x_fastest_order() {
        let mut image = Image::empty(small_fov());
        image[[1, 2, 0]] = 4.5;
        assert_eq!(image[1 + 2 * 3], 4.5);
        image[26] = 7.5;
        assert_eq!(image[[2, 2, 2]], 7.5);
    }

    #[test]
    fn wrong_data_length_is_rejected() {
        let result = Image::new(small_fov(), vec![0.0; 26]);
        assert!(matches!(result, Err(Error::ImageShape { expected: 27, found: 26 })));
    }

    #[test]
    fn initial_estimate_excludes_dead_voxels() {
        let fov = small_fov();
        let mut sensitivity = Image::ones(fov);
        sensitivity[[0, 1, 2]] = 0.0;
        let initial = Image::initial_estimate(fov, &sensitivity);
        assert_eq!(initial[[0, 1, 2]], 0.0);
        assert_eq!(initial[[1, 1, 2]], 1.0);
        assert_eq!(initial.data.iter().sum::<f32>(), 26.0);
    }
}
