//! Mathematical utilities and physical constants.

/// Physical constants, numerical thresholds and model defaults.
pub mod constants;

/// Screened Coulomb interaction between Gaussian charge distributions.
///
/// Used by the EEQ charge model, together with its radial derivative for the
/// charge-response gradient.
pub mod coulomb;

/// Euclidean distance and the difference vector between two points.
#[inline]
pub(crate) fn distance(a: [f64; 3], b: [f64; 3]) -> (f64, [f64; 3]) {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    ((d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt(), d)
}

/// `a += s * v` on 3-vectors.
#[inline]
pub(crate) fn axpy(a: &mut [f64; 3], s: f64, v: [f64; 3]) {
    a[0] += s * v[0];
    a[1] += s * v[1];
    a[2] += s * v[2];
}
