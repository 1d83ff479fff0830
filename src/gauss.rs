//! Time-of-flight weighting: turn a coincidence timing resolution into a
//! Gaussian weight along the LOR.

use crate::{C, Lengthf32, Ratiof32, Timef32, TWOPI};

/// 2 * sqrt(2 ln 2): ratio between the FWHM and the sigma of a Gaussian.
const FWHM_TO_SIGMA: f32 = 2.354_820_2;

/// Time-of-flight weighting parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tof {
    /// FWHM of the coincidence timing uncertainty, in ps
    pub fwhm: Timef32,
    /// Ignore contributions further than this many sigmas from the TOF peak
    pub cutoff: Option<Ratiof32>,
}

impl Tof {
    pub fn new(fwhm: Timef32, cutoff: Option<Ratiof32>) -> Self {
        Self { fwhm, cutoff }
    }

    /// Spatial sigma of the emission-point estimate along the LOR.
    ///
    /// A timing difference `dt` displaces the estimated emission point by
    /// `C * dt / 2`, so a timing FWHM in ps maps onto a position sigma in mm
    /// as `C * (fwhm / (2 sqrt(2 ln 2))) / 2`.
    pub fn sigma(self) -> Lengthf32 {
        C * (self.fwhm / FWHM_TO_SIGMA) / 2.0
    }
}

/// Gaussian density centred on the TOF peak, truncated at `cutoff` sigmas.
///
/// The MLEM update is invariant under a global rescaling of the projection
/// weights, so the absolute normalization of the density is irrelevant; the
/// standard 1/(sigma sqrt(2 pi)) peak height is used anyway to keep the
/// values physically interpretable.
fn make_gauss(sigma: Lengthf32, cutoff: Option<Ratiof32>) -> impl Fn(Lengthf32) -> Lengthf32 {
    let root_two_pi = TWOPI.sqrt();
    let peak_height = 1.0 / (sigma * root_two_pi);
    let cutoff = cutoff.map_or(f32::INFINITY, |width| width * sigma);
    move |dx: Lengthf32| -> Lengthf32 {
        if dx.abs() < cutoff {
            let y = dx / sigma;
            peak_height * (-0.5 * y * y).exp()
        } else {
            0.0
        }
    }
}

pub fn make_gauss_option(tof: Option<Tof>) -> Option<impl Fn(Lengthf32) -> Lengthf32> {
    tof.map(|tof| make_gauss(tof.sigma(), tof.cutoff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn sigma_from_fwhm() {
        // 200 ps FWHM: 200 / 2.3548 ps sigma, times C/2 mm/ps
        let tof = Tof::new(200.0, None);
        assert_float_eq!(tof.sigma(), 12.731, rel <= 1e-3);
    }

    #[test]
    fn gaussian_is_symmetric_and_peaks_at_zero() {
        let g = make_gauss(10.0, None);
        assert_float_eq!(g(5.0), g(-5.0), ulps <= 1);
        assert!(g(0.0) > g(1.0));
        assert!(g(1.0) > g(20.0));
    }

    #[test]
    fn cutoff_zeroes_the_tails() {
        let g = make_gauss(10.0, Some(3.0));
        assert!(g(29.9) > 0.0);
        assert_eq!(g(30.0), 0.0);
        assert_eq!(g(-45.0), 0.0);
    }

    #[test]
    fn no_cutoff_leaves_tails_positive() {
        let g = make_gauss(10.0, None);
        assert!(g(100.0) > 0.0);
    }
}
