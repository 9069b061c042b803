//! Coulomb interaction of two spherical Gaussian charge distributions.
//!
//! For widths `rad_i` and `rad_j` the interaction is `erf(γ r) / r` with
//! `γ = 1 / sqrt(rad_i² + rad_j²)`, which stays finite as `r → 0`.

use super::constants::DISTANCE_EPSILON;
use libm::erf;
use std::f64::consts::PI;

/// Combined Gaussian exponent of two charge distributions.
#[inline]
pub fn pair_exponent(rad_i: f64, rad_j: f64) -> f64 {
    1.0 / (rad_i * rad_i + rad_j * rad_j).sqrt()
}

/// Evaluates the screened interaction `erf(γ r) / r` (atomic units).
#[inline]
pub fn gaussian_interaction(r: f64, gamma: f64) -> f64 {
    if r > DISTANCE_EPSILON {
        erf(gamma * r) / r
    } else {
        2.0 * gamma / PI.sqrt()
    }
}

/// Radial derivative of [`gaussian_interaction`].
#[inline]
pub fn gaussian_interaction_derivative(r: f64, gamma: f64) -> f64 {
    if r > DISTANCE_EPSILON {
        let gr = gamma * r;
        2.0 * gamma * (-gr * gr).exp() / (PI.sqrt() * r) - erf(gr) / (r * r)
    } else {
        0.0
    }
}

/// Self-interaction of a Gaussian charge of width `rad`.
#[inline]
pub fn self_interaction(rad: f64) -> f64 {
    (2.0 / PI).sqrt() / rad
}
