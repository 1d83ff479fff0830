//! The MLEM iteration engine: forward-project the current estimate onto the
//! measured LORs, back-project the reciprocal of each LOR's forward
//! projection, normalize by the sensitivity, repeat.

use std::path::{Path, PathBuf};

use ndarray::azip;

#[cfg(not(feature = "serial"))]
use rayon::prelude::*;

use crate::{Intensityf32, Lengthf32, Weightf32};
use crate::error::{Error, Result};
use crate::fov::FOV;
use crate::gauss::{make_gauss_option, Tof};
use crate::image::{Image, ImageData};
use crate::index::Index1_u;
use crate::system_matrix::{lor_fov_hit, system_matrix_elements, FovHit, LOR};
use crate::utils::timing::Progress;

/// Parameters of one reconstruction run.
#[derive(Clone, Debug)]
pub struct Parameters {

    /// Number of MLEM iterations to perform
    pub iterations: usize,

    /// Time-of-flight weighting; `None` weights uniformly along the LOR
    pub tof: Option<Tof>,

    /// Image full-width in x and y, in mm
    pub size_xy: Lengthf32,
    /// Image full-width in z, in mm
    pub size_z: Lengthf32,
    /// Number of voxels along each of x and y
    pub nvoxels_xy: usize,
    /// Number of voxels along z
    pub nvoxels_z: usize,

    /// Checkpoint path prefix: iteration `n` is written to `{prefix}{n}.raw`
    pub prefix: String,

    /// Write a checkpoint every `save_every` iterations; `<= 0` writes the
    /// final image only
    pub save_every: i32,
}

impl Parameters {

    pub fn fov(&self) -> FOV {
        FOV::new((self.size_xy, self.size_xy, self.size_z),
                 (self.nvoxels_xy, self.nvoxels_xy, self.nvoxels_z))
    }

    fn validate(&self) -> Result<()> {
        for (name, n) in [("nvoxels_xy", self.nvoxels_xy), ("nvoxels_z", self.nvoxels_z)] {
            if n == 0 {
                return Err(Error::InvalidGrid(format!("{name} must be positive")));
            }
        }
        for (name, s) in [("size_xy", self.size_xy), ("size_z", self.size_z)] {
            if !(s > 0.0) {
                return Err(Error::InvalidGrid(format!("{name} must be positive, got {s}")));
            }
        }
        let dir = output_directory(&self.prefix);
        if !dir.is_dir() {
            return Err(Error::MissingOutputDirectory(dir));
        }
        Ok(())
    }
}

/// Directory into which checkpoints with the given prefix will be written.
/// It must exist before reconstruction starts; it is never created here.
fn output_directory(prefix: &str) -> PathBuf {
    if prefix.ends_with('/') || prefix.ends_with(std::path::MAIN_SEPARATOR) {
        return PathBuf::from(prefix);
    }
    match Path::new(prefix).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn checkpoint_path(prefix: &str, iteration: usize) -> PathBuf {
    PathBuf::from(format!("{prefix}{iteration}.raw"))
}

fn checkpoint_due(iteration: usize, save_every: i32) -> bool {
    save_every > 0 && iteration % save_every as usize == 0
}

/// Run a complete list-mode MLEM reconstruction.
///
/// Validates all inputs up front, performs exactly `params.iterations`
/// iterations over `lors`, writes checkpoints as configured and returns the
/// final image estimate. When no sensitivity volume is supplied, uniform
/// sensitivity is assumed.
///
/// A failed intermediate checkpoint is reported on stderr without aborting
/// the run; a failed write of the final image is an error.
pub fn reconstruct(
    params:      &Parameters,
    lors:        &[LOR],
    sensitivity: Option<Image>,
) -> Result<Image> {
    params.validate()?;
    let fov = params.fov();

    let sensitivity = sensitivity.unwrap_or_else(|| {
        println!("Sensitivity volume not supplied: assuming uniform sensitivity.");
        Image::ones(fov)
    });
    if sensitivity.fov.n != fov.n {
        return Err(Error::SensitivityShape { expected: fov.n, found: sensitivity.fov.n });
    }

    let mut image = Image::initial_estimate(fov, &sensitivity);
    let mut progress = Progress::new();
    for n in 1..=params.iterations {
        image.one_iteration(lors, &sensitivity.data, params.tof);
        progress.done_with_message(&format!("iteration {n:3}"));

        let last = n == params.iterations;
        if last || checkpoint_due(n, params.save_every) {
            let path = checkpoint_path(&params.prefix, n);
            match image.write_to_raw_file(&path) {
                Ok(()) => {}
                Err(e) if last => return Err(e),
                // Losing one checkpoint must not lose the whole run
                Err(e) => eprintln!("Failed to write checkpoint {}: {}", path.display(), e),
            }
        }
    }
    Ok(image)
}

impl Image {

    /// An infinite sequence of images, each one made by performing one MLEM
    /// iteration on the previous one, starting from a uniform estimate.
    pub fn mlem<'a>(fov: FOV,
                    measured_lors: &'a [LOR],
                    tof          :     Option<Tof>,
                    sensitivity  :     Option<Self>,
    ) -> impl Iterator<Item = Image> + 'a {

        let sensitivity = sensitivity.unwrap_or_else(|| Self::ones(fov));
        let mut image = Self::initial_estimate(fov, &sensitivity);

        std::iter::from_fn(move || {
            image.one_iteration(measured_lors, &sensitivity.data, tof);
            Some(image.clone())
        })
    }

    fn one_iteration(&mut self, measured_lors: &[LOR], sensitivity: &[Intensityf32], tof: Option<Tof>) {

        // -------- Prepare state required by serial/parallel fold --------------

        // TOF adjustment to apply to the weights
        let tof = make_gauss_option(tof);

        // Closure preparing the state needed by `fold`: will be called by
        // `fold` at the start of every thread that is launched.
        let initial_thread_state = || {
            let (backprojection, weights, indices) = projection_buffers(self.fov);
            (backprojection, weights, indices, &self, &tof)
        };

        // Parallel fold takes a function which will return the identity value;
        // serial fold takes the identity value itself.
        #[cfg(feature = "serial")]
        let initial_thread_state = initial_thread_state();

        // Choose between serial and parallel iteration
        #[cfg    (feature = "serial") ] let iter = measured_lors.    iter();
        #[cfg(not(feature = "serial"))] let iter = measured_lors.par_iter();

        // -------- Project all LORs forwards and backwards ---------------------

        let fold_result = iter.fold(initial_thread_state, project_one_lor);

        // -------- extract relevant information (backprojection) ---------------

        // In the serial case, there is a single result to unwrap ...
        #[cfg(feature = "serial")]
        let backprojection = fold_result.0; // Keep only backprojection

        // ... in the parallel case, the results from each thread must be
        // combined
        #[cfg(not(feature = "serial"))]
        let backprojection = {
            fold_result
            // Keep only the backprojection (ignore weights and indices)
            .map(|tuple| tuple.0)
            // Sum the backprojections calculated on each thread
            .reduce(|   | zeros_buffer(self.fov),
                    |l,r| l.iter().zip(r.iter()).map(|(l,r)| l+r).collect())
        };

        // -------- Correct for detector sensitivity ----------------------------

        apply_sensitivity_image(&mut self.data, &backprojection, sensitivity);
    }
}

fn projection_buffers(fov: FOV) -> (ImageData, Vec<Weightf32>, Vec<Index1_u>) {
    // The backprojection accumulator filled in during one MLEM iteration.
    let image = zeros_buffer(fov);
    // Weights and indices are sparse storage of the slice through the system
    // matrix which corresponds to the current LOR. (Allocating these anew for
    // each LOR had a noticeable runtime cost.)
    let [nx, ny, nz] = fov.n;
    let max_number_of_active_voxels_possible = nx + ny + nz - 2;
    let weights = Vec::with_capacity(max_number_of_active_voxels_possible);
    let indices = Vec::with_capacity(max_number_of_active_voxels_possible);
    (image, weights, indices)
}

// A new empty data store with matching size
fn zeros_buffer(fov: FOV) -> ImageData { vec![0.0; fov.nvoxels()] }

type FoldState<'r, 'i, 'g, G> = (ImageData, Vec<Weightf32>, Vec<Index1_u>, &'r &'i mut Image, &'g Option<G>);

fn project_one_lor<'r, 'i, 'g, G>(state: FoldState<'r, 'i, 'g, G>, lor: &LOR) -> FoldState<'r, 'i, 'g, G>
where
    G: Fn(Lengthf32) -> Lengthf32
{
    let (mut backprojection, mut weights, mut indices, image, tof) = state;

    // Analyse point where LOR hits FOV
    match lor_fov_hit(lor, image.fov) {

        // LOR missed FOV: nothing to be done
        None => return (backprojection, weights, indices, image, tof),

        // Data needed by `system_matrix_elements`
        Some(FovHit { next_boundary, voxel_size, index, delta_index, remaining, tof_peak }) => {

            // Throw away previous LOR's values
            weights.clear();
            indices.clear();

            // Find active voxels and their weights
            system_matrix_elements(
                &mut indices, &mut weights,
                next_boundary, voxel_size,
                index, delta_index, remaining,
                tof_peak, tof,
            );

            // Stray indices would corrupt the accumulator
            if indices.iter().any(|&i| i >= backprojection.len()) {
                return (backprojection, weights, indices, image, tof);
            }

            // Forward projection of current image into this LOR
            let projection = forward_project(&weights, &indices, image);

            // A LOR whose forward projection vanishes has no contributing
            // voxels: it adds nothing to the backprojection, and the ratio
            // 1/projection must not be formed.
            if projection > 0.0 {
                back_project(&mut backprojection, &weights, &indices, projection);
            }
        }
    }
    // Return updated FoldState
    (backprojection, weights, indices, image, tof)
}

#[inline]
fn forward_project(weights: &[Weightf32], indices: &[Index1_u], image: &Image) -> Intensityf32 {
    let mut projection = 0.0;
    for (w, &j) in weights.iter().zip(indices.iter()) {
        projection += w * image[j]
    }
    projection
}

#[inline]
fn back_project(backprojection: &mut [Intensityf32], weights: &[Weightf32], indices: &[Index1_u], projection: Intensityf32) {
    let projection_reciprocal = 1.0 / projection;
    for (w, &j) in weights.iter().zip(indices.iter()) {
        backprojection[j] += w * projection_reciprocal;
    }
}

fn apply_sensitivity_image(image: &mut ImageData, backprojection: &[Intensityf32], sensitivity: &[Intensityf32]) {
    azip!((voxel in image, &b in backprojection, &s in sensitivity) {
        if s > 0.0 { *voxel *= b / s }
        else       { *voxel  = 0.0   }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_schedule() {
        assert!(!checkpoint_due(1, -1));
        assert!(!checkpoint_due(1, 0));
        assert!(!checkpoint_due(1, 2));
        assert!( checkpoint_due(2, 2));
        assert!(!checkpoint_due(3, 2));
        assert!( checkpoint_due(4, 2));
        assert!( checkpoint_due(1, 1));
    }

    #[test]
    fn checkpoint_file_naming() {
        assert_eq!(checkpoint_path("out/img_", 7), PathBuf::from("out/img_7.raw"));
        assert_eq!(checkpoint_path("mlem", 12), PathBuf::from("mlem12.raw"));
    }

    #[test]
    fn output_directory_from_prefix() {
        assert_eq!(output_directory("out/img_"), PathBuf::from("out"));
        assert_eq!(output_directory("out/"), PathBuf::from("out/"));
        assert_eq!(output_directory("mlem"), PathBuf::from("."));
        assert_eq!(output_directory(""), PathBuf::from("."));
    }
}
