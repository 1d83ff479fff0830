//! Error taxonomy of the reconstruction library.
//!
//! Input validation problems are reported before any iteration runs; numeric
//! edge cases inside the algorithm (LORs with empty projection support,
//! voxels with zero sensitivity) are absorbed by the iteration engine and
//! never surface here.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {

    /// The eight columnar LOR arrays did not all have the same length.
    #[error("LOR component `{component}` has {found} values, expected {expected}")]
    MismatchedLorComponents {
        component: &'static str,
        expected: usize,
        found: usize,
    },

    /// The sensitivity volume does not match the voxel grid.
    #[error("sensitivity volume has dimensions {found:?}, expected {expected:?}")]
    SensitivityShape {
        expected: [usize; 3],
        found: [usize; 3],
    },

    /// Image data of the wrong length for the grid it claims to cover.
    #[error("image data has {found} voxels, but the grid needs {expected}")]
    ImageShape { expected: usize, found: usize },

    /// Checkpoints can only be written to a directory that already exists.
    #[error("output directory `{0}` does not exist")]
    MissingOutputDirectory(PathBuf),

    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("image file `{0}` not found")]
    NotFound(PathBuf),

    /// A raw image file whose byte length does not match the expected grid.
    #[error("image file `{path}` is {found} bytes, expected {expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    #[error("could not parse LOR on line {line}: {reason}")]
    MalformedLor { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Config(#[from] toml::de::Error),
}
