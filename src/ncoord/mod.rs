//! Fractional coordination numbers from geometry and covalent radii.
//!
//! Every pair `i != j` within the cutoff adds `f(r_ij, rcov_i + rcov_j)` to both atoms,
//! optionally scaled by a pair factor. Distances are clamped away from zero before the
//! counting function sees them. The derivatives are kept as a dense `n x n` table of
//! Cartesian vectors, `dcn_i / dr_k`, which callers contract with `dE/dcn`.

mod counting;

pub use counting::{Counting, CountingFunction, ErfCount, ExpCount};

use crate::error::DispersionError;
use crate::math::constants::{CN_K4, CN_K5, CN_K6, DISTANCE_EPSILON};
use crate::math::{axpy, distance};
use rayon::prelude::*;

/// Derivatives of the coordination numbers with respect to the atomic positions.
#[derive(Debug, Clone, PartialEq)]
pub struct CnDerivatives {
    n_atoms: usize,
    data: Vec<[f64; 3]>,
}

impl CnDerivatives {
    fn zeros(n_atoms: usize) -> Self {
        Self {
            n_atoms,
            data: vec![[0.0; 3]; n_atoms * n_atoms],
        }
    }

    /// `dcn_i / dr_k`.
    pub fn get(&self, i: usize, k: usize) -> [f64; 3] {
        self.data[i * self.n_atoms + k]
    }

    /// Chains `dE/dcn` into a nuclear gradient, `g_k = sum_i dE/dcn_i dcn_i/dr_k`.
    pub fn contract(&self, de_dcn: &[f64]) -> Vec<[f64; 3]> {
        let mut gradient = vec![[0.0; 3]; self.n_atoms];
        for (i, &weight) in de_dcn.iter().enumerate() {
            if weight == 0.0 {
                continue;
            }
            let row = &self.data[i * self.n_atoms..(i + 1) * self.n_atoms];
            for (g, d) in gradient.iter_mut().zip(row) {
                axpy(g, weight, *d);
            }
        }
        gradient
    }
}

/// Coordination numbers and, if requested, their position derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinationNumbers {
    pub cn: Vec<f64>,
    pub derivatives: Option<CnDerivatives>,
}

/// Coordination number with a plain counting function.
///
/// `cn_max` switches on the smooth saturation
/// `log(1 + e^max) - log(1 + e^(max - cn))`.
///
/// # Errors
///
/// Returns `DispersionError::ShapeMismatch` if positions or radii do not match the species.
pub fn coordination_number<C: CountingFunction>(
    species: &[u8],
    positions: &[[f64; 3]],
    covalent_radii: &[f64],
    cutoff: f64,
    counting: &C,
    cn_max: Option<f64>,
    with_derivatives: bool,
) -> Result<CoordinationNumbers, DispersionError> {
    DispersionError::check_len("positions", species.len(), positions.len())?;
    DispersionError::check_len("covalent radii", species.len(), covalent_radii.len())?;

    let mut result = accumulate(positions, covalent_radii, cutoff, counting, |_, _| 1.0, with_derivatives);
    if let Some(cn_max) = cn_max {
        saturate(&mut result, cn_max);
    }
    Ok(result)
}

/// A complete coordination number definition: counting function, optional
/// electronegativity pair weighting and optional saturation.
///
/// The default is the D4 coordination number, error-function counting weighted by
/// `k4 exp(-(|en_i - en_j| + k5)^2 / k6)` and no saturation.
///
/// # Examples
///
/// ```
/// use dftd4::ncoord::{CnFunction, ExpCount};
///
/// let cn = CnFunction::default()
///     .with_counting(ExpCount::default())
///     .with_electronegativity_weighting(false)
///     .with_cn_max(Some(8.0));
/// assert_eq!(cn.cn_max, Some(8.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CnFunction {
    pub counting: Counting,
    pub electronegativity_weighted: bool,
    pub cn_max: Option<f64>,
}

impl Default for CnFunction {
    fn default() -> Self {
        Self {
            counting: Counting::default(),
            electronegativity_weighted: true,
            cn_max: None,
        }
    }
}

impl CnFunction {
    pub fn with_counting(mut self, counting: impl Into<Counting>) -> Self {
        self.counting = counting.into();
        self
    }

    pub fn with_electronegativity_weighting(mut self, weighted: bool) -> Self {
        self.electronegativity_weighted = weighted;
        self
    }

    pub fn with_cn_max(mut self, cn_max: Option<f64>) -> Self {
        self.cn_max = cn_max;
        self
    }

    /// Evaluates the coordination numbers.
    ///
    /// `electronegativities` is only read when the pair weighting is switched on.
    ///
    /// # Errors
    ///
    /// Returns `DispersionError::ShapeMismatch` if any per-atom input does not match the
    /// species.
    pub fn compute(
        &self,
        species: &[u8],
        positions: &[[f64; 3]],
        covalent_radii: &[f64],
        electronegativities: &[f64],
        cutoff: f64,
        with_derivatives: bool,
    ) -> Result<CoordinationNumbers, DispersionError> {
        if !self.electronegativity_weighted {
            return coordination_number(
                species,
                positions,
                covalent_radii,
                cutoff,
                &self.counting,
                self.cn_max,
                with_derivatives,
            );
        }

        DispersionError::check_len("positions", species.len(), positions.len())?;
        DispersionError::check_len("covalent radii", species.len(), covalent_radii.len())?;
        DispersionError::check_len("electronegativities", species.len(), electronegativities.len())?;

        let pair_factor = |i: usize, j: usize| {
            let den = (electronegativities[i] - electronegativities[j]).abs() + CN_K5;
            CN_K4 * (-den * den / CN_K6).exp()
        };

        let mut result = accumulate(
            positions,
            covalent_radii,
            cutoff,
            &self.counting,
            pair_factor,
            with_derivatives,
        );
        if let Some(cn_max) = self.cn_max {
            saturate(&mut result, cn_max);
        }
        Ok(result)
    }
}

/// D4 coordination number: error-function counting weighted by the
/// electronegativity difference of each pair.
pub fn d4_coordination_number(
    species: &[u8],
    positions: &[[f64; 3]],
    covalent_radii: &[f64],
    electronegativities: &[f64],
    cutoff: f64,
    with_derivatives: bool,
) -> Result<CoordinationNumbers, DispersionError> {
    CnFunction::default().compute(
        species,
        positions,
        covalent_radii,
        electronegativities,
        cutoff,
        with_derivatives,
    )
}

fn accumulate<C, F>(
    positions: &[[f64; 3]],
    covalent_radii: &[f64],
    cutoff: f64,
    counting: &C,
    pair_factor: F,
    with_derivatives: bool,
) -> CoordinationNumbers
where
    C: CountingFunction,
    F: Fn(usize, usize) -> f64 + Sync,
{
    let n_atoms = positions.len();

    // Each row i is owned by one task: cn_i and dcn_i/dr_k for all k.
    let rows: Vec<(f64, Vec<[f64; 3]>)> = (0..n_atoms)
        .into_par_iter()
        .map(|i| {
            let mut cn = 0.0;
            let mut row = if with_derivatives {
                vec![[0.0; 3]; n_atoms]
            } else {
                Vec::new()
            };

            for j in 0..n_atoms {
                if j == i {
                    continue;
                }
                let (r, rij) = distance(positions[i], positions[j]);
                if r > cutoff || !r.is_finite() {
                    continue;
                }
                let r = r.max(DISTANCE_EPSILON);
                let rc = covalent_radii[i] + covalent_radii[j];
                let factor = pair_factor(i, j);

                cn += factor * counting.count(r, rc);

                if with_derivatives {
                    let dc = factor * counting.derivative(r, rc) / r;
                    axpy(&mut row[i], dc, rij);
                    axpy(&mut row[j], -dc, rij);
                }
            }
            (cn, row)
        })
        .collect();

    let mut cn = Vec::with_capacity(n_atoms);
    let mut derivatives = with_derivatives.then(|| CnDerivatives::zeros(n_atoms));
    for (i, (value, row)) in rows.into_iter().enumerate() {
        cn.push(value);
        if let Some(derivatives) = derivatives.as_mut() {
            derivatives.data[i * n_atoms..(i + 1) * n_atoms].copy_from_slice(&row);
        }
    }

    CoordinationNumbers { cn, derivatives }
}

/// Smooth cap of a raw coordination number at `cn_max`.
#[inline]
pub fn cut_coordination_number(cn: f64, cn_max: f64) -> f64 {
    cn_max.exp().ln_1p() - (cn_max - cn).exp().ln_1p()
}

/// Derivative of [`cut_coordination_number`] with respect to the raw value.
#[inline]
pub fn cut_coordination_number_derivative(cn: f64, cn_max: f64) -> f64 {
    1.0 / (1.0 + (cn - cn_max).exp())
}

fn saturate(result: &mut CoordinationNumbers, cn_max: f64) {
    let n_atoms = result.cn.len();
    for (i, cn) in result.cn.iter_mut().enumerate() {
        let raw = *cn;
        *cn = cut_coordination_number(raw, cn_max);

        if let Some(derivatives) = result.derivatives.as_mut() {
            let scale = cut_coordination_number_derivative(raw, cn_max);
            for d in &mut derivatives.data[i * n_atoms..(i + 1) * n_atoms] {
                *d = [d[0] * scale, d[1] * scale, d[2] * scale];
            }
        }
    }
}
