pub use crate::error::{Error, Result};
pub use crate::fov::FOV;
pub use crate::gauss::Tof;
pub use crate::image::Image;
pub use crate::mlem::{reconstruct, Parameters};
pub use crate::system_matrix::LOR;

use nalgebra as na;

pub type Lengthf32    = f32;
pub type Timef32      = f32;
pub type Weightf32    = f32;
pub type Ratiof32     = f32;
pub type Intensityf32 = f32;

pub type Vector = na::Vector3<Lengthf32>;
pub type Point  = na::Point3 <Lengthf32>;

pub use crate::index::{BoxDim_u, Index1_u, Index3_u};

/// Speed of light in mm/ps.
#[allow(clippy::excessive_precision)] // Stick to official definition of c
pub const C: Lengthf32 = 0.299_792_458;

pub const TWOPI: Lengthf32 = std::f32::consts::TAU;
