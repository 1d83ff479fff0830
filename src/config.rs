//! Configuration file parser for reconstruction runs.
//!
//! The TOML file carries the engine parameters only; input and output
//! locations belong to the caller (CLI flags, library arguments).

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{Lengthf32, Ratiof32, Timef32};
use crate::error::Result;
use crate::gauss::Tof;
use crate::mlem::Parameters;

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {

    /// Number of MLEM iterations to perform
    pub iterations: usize,

    /// Coincidence timing resolution (FWHM, in ps); omit to disable TOF
    #[serde(default)]
    pub tof: Option<Timef32>,

    /// Ignore TOF contributions beyond this many sigmas from the peak
    #[serde(default = "default_cutoff")]
    pub cutoff: Ratiof32,

    /// Image full-width in x and y, in mm
    #[serde(default = "default_size")]
    pub size_xy: Lengthf32,

    /// Image full-width in z, in mm
    #[serde(default = "default_size")]
    pub size_z: Lengthf32,

    /// Number of voxels along each of x and y
    #[serde(default = "default_nvoxels")]
    pub nvoxels_xy: usize,

    /// Number of voxels along z
    #[serde(default = "default_nvoxels")]
    pub nvoxels_z: usize,

    /// Checkpoint filename prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Checkpoint interval in iterations; <= 0 writes the final image only
    #[serde(default = "default_save_every")]
    pub save_every: i32,
}

fn default_cutoff()     -> Ratiof32  { 3.0 }
fn default_size()       -> Lengthf32 { 180.0 }
fn default_nvoxels()    -> usize     { 60 }
fn default_prefix()     -> String    { "mlem".into() }
fn default_save_every() -> i32       { -1 }

impl Config {
    pub fn parameters(&self) -> Parameters {
        Parameters {
            iterations: self.iterations,
            tof: self.tof.map(|fwhm| Tof::new(fwhm, Some(self.cutoff))),
            size_xy: self.size_xy,
            size_z: self.size_z,
            nvoxels_xy: self.nvoxels_xy,
            nvoxels_z: self.nvoxels_z,
            prefix: self.prefix.clone(),
            save_every: self.save_every,
        }
    }
}

pub fn read_config_file(path: &Path) -> Result<Config> {
    let config = fs::read_to_string(path)?;
    Ok(toml::from_str(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    // ----- Test the example on-disk config file ------------------------------
    #[test]
    fn test_config_file() {
        let config = read_config_file(Path::new("mlem-config.toml")).unwrap();
        assert_eq!(config.iterations, 4);
        assert_eq!(config.tof, Some(200.0));
        assert_eq!(config.cutoff, 3.0);
        assert_eq!(config.size_xy, 180.0);
        assert_eq!(config.size_z, 180.0);
        assert_eq!(config.nvoxels_xy, 60);
        assert_eq!(config.nvoxels_z, 60);
        assert_eq!(config.prefix, "data/out/mlem");
        assert_eq!(config.save_every, 2);
    }

    fn parse(input: &str) -> Config {
        toml::from_str(input).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = parse("iterations = 10");
        assert_eq!(config.iterations, 10);
        assert_eq!(config.tof, None);
        assert_eq!(config.cutoff, 3.0);
        assert_eq!(config.size_xy, 180.0);
        assert_eq!(config.nvoxels_z, 60);
        assert_eq!(config.prefix, "mlem");
        assert_eq!(config.save_every, -1);
    }

    #[test]
    fn config_iterations_is_mandatory() {
        assert!(toml::from_str::<Config>("tof = 200.0").is_err());
    }

    // ----- Make sure that unknown fields are not accepted --------------------
    #[test]
    fn config_reject_unknown_field() {
        assert!(toml::from_str::<Config>("iterations = 1\nunknown_field = 666").is_err());
    }

    #[test]
    fn config_into_parameters() {
        let config = parse(r#"
            iterations = 3
            tof = 100.0
            cutoff = 2.5
            nvoxels_z = 30
        "#);
        let params = config.parameters();
        assert_eq!(params.iterations, 3);
        assert_eq!(params.tof, Some(Tof::new(100.0, Some(2.5))));
        assert_eq!(params.nvoxels_xy, 60);
        assert_eq!(params.nvoxels_z, 30);
        assert_eq!(params.fov().n, [60, 60, 30]);
    }

    #[test]
    fn config_without_tof_weights_uniformly() {
        let config = parse("iterations = 1\ncutoff = 2.0");
        assert_eq!(config.parameters().tof, None);
    }
}
