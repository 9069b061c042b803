//! This module implements the electronegativity equilibration (EEQ) charge model.
//!
//! Atomic partial charges minimise a second-order energy expression in which every atom
//! carries a Gaussian charge distribution. The electronegativity of an atom is shifted by
//! the square root of its coordination number, so the charges respond to geometry even
//! beyond the explicit Coulomb coupling. The resulting linear system, with a Lagrange row
//! enforcing the total charge, is solved with a dense LU decomposition. The same system
//! yields the charge response needed for analytic nuclear gradients.

use super::options::EeqOptions;
use crate::{
    error::DispersionError,
    math::{axpy, constants::DISTANCE_EPSILON, coulomb, distance},
    ncoord::{self, CoordinationNumbers, ErfCount},
    params::{EeqParameters, ReferenceData},
};
use faer::{Col, Mat, prelude::*};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};

/// A thread-safe wrapper for raw matrix access to enable parallel filling.
///
/// Threads write to disjoint entries of the matrix without locking; the parallel loop
/// below guarantees that every entry has exactly one writer.
struct UnsafeMatView {
    ptr: *mut f64,
    row_stride: isize,
    col_stride: isize,
}

unsafe impl Send for UnsafeMatView {}
unsafe impl Sync for UnsafeMatView {}

impl UnsafeMatView {
    /// Writes a value to the matrix at the specified (row, col) index.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// 1. The (row, col) indices are within bounds.
    /// 2. No other thread is writing to the same address simultaneously.
    unsafe fn write(&self, row: usize, col: usize, val: f64) {
        let offset = (row as isize) * self.row_stride + (col as isize) * self.col_stride;
        unsafe {
            *self.ptr.offset(offset) = val;
        }
    }
}

/// Partial charges of a system together with the constraint multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeResult {
    /// Partial charge of every atom, in elementary charges.
    pub charges: Vec<f64>,
    /// Lagrange multiplier of the total-charge constraint (Hartree).
    pub equilibrated_potential: f64,
}

/// The EEQ charge model.
///
/// Holds a reference to the per-element parameters and the coordination-number options.
pub struct EeqModel<'p> {
    parameters: &'p ReferenceData,
    options: EeqOptions,
}

impl<'p> EeqModel<'p> {
    /// Creates a new `EeqModel` with default options.
    ///
    /// # Examples
    ///
    /// ```
    /// use dftd4::{get_default_reference, EeqModel};
    ///
    /// let eeq = EeqModel::new(get_default_reference());
    /// ```
    pub fn new(parameters: &'p ReferenceData) -> Self {
        Self {
            parameters,
            options: EeqOptions::default(),
        }
    }

    /// Configures the model with custom options, consuming it.
    ///
    /// # Examples
    ///
    /// ```
    /// use dftd4::{get_default_reference, EeqModel, EeqOptions};
    ///
    /// let options = EeqOptions {
    ///     cutoff: 20.0,
    ///     ..Default::default()
    /// };
    /// let eeq = EeqModel::new(get_default_reference()).with_options(options);
    /// ```
    pub fn with_options(mut self, options: EeqOptions) -> Self {
        self.options = options;
        self
    }

    /// Solves the EEQ equations for a molecule.
    ///
    /// # Arguments
    ///
    /// * `species` - Atomic numbers.
    /// * `positions` - Cartesian coordinates in Bohr.
    /// * `total_charge` - Net charge the partial charges must add up to.
    ///
    /// # Errors
    ///
    /// Returns `DispersionError::NoAtoms` for an empty system, `ShapeMismatch` for
    /// inconsistent inputs, `ParameterNotFound` for elements without EEQ parameters and
    /// `LinalgError` if the linear system cannot be solved.
    ///
    /// # Examples
    ///
    /// ```
    /// use dftd4::{get_default_reference, EeqModel};
    ///
    /// let eeq = EeqModel::new(get_default_reference());
    /// let species = [8, 1, 1];
    /// let positions = [
    ///     [0.0, 0.0, -0.1294],
    ///     [0.0, -1.4941, 1.0274],
    ///     [0.0, 1.4941, 1.0274],
    /// ];
    ///
    /// let result = eeq.solve(&species, &positions, 0.0).unwrap();
    /// assert!(result.charges[0] < 0.0);
    /// ```
    pub fn solve(
        &self,
        species: &[u8],
        positions: &[[f64; 3]],
        total_charge: f64,
    ) -> Result<ChargeResult, DispersionError> {
        self.validate(species, positions)?;
        let element_data = self.fetch_element_data(species)?;
        let system = self.build_system(species, positions, &element_data, total_charge, false)?;

        let solution = solve_linear(&system.matrix, &system.rhs)?;
        let n_atoms = species.len();

        Ok(ChargeResult {
            charges: (0..n_atoms).map(|i| solution[i]).collect(),
            equilibrated_potential: solution[n_atoms],
        })
    }

    /// Nuclear gradient carried by the charges, `sum_i dE/dq_i dq_i/dr`.
    ///
    /// Uses the adjoint of the linear system: with `A l = (dE/dq, 0)` the response is
    /// `sum_i l_i dx_i/dr - sum_ij l_i dA_ij/dr q_j`, so no derivative of the charges is
    /// ever formed explicitly.
    ///
    /// # Arguments
    ///
    /// * `charges` - The charges returned by [`EeqModel::solve`] for this geometry.
    /// * `de_dq` - Derivative of the energy with respect to every charge.
    pub fn charge_response(
        &self,
        species: &[u8],
        positions: &[[f64; 3]],
        charges: &[f64],
        de_dq: &[f64],
    ) -> Result<Vec<[f64; 3]>, DispersionError> {
        self.validate(species, positions)?;
        DispersionError::check_len("charges", species.len(), charges.len())?;
        DispersionError::check_len("charge derivatives", species.len(), de_dq.len())?;

        let element_data = self.fetch_element_data(species)?;
        let total_charge = charges.iter().sum();
        let system = self.build_system(species, positions, &element_data, total_charge, true)?;

        let n_atoms = species.len();
        let mut adjoint_rhs = Col::zeros(n_atoms + 1);
        for (i, &value) in de_dq.iter().enumerate() {
            adjoint_rhs[i] = value;
        }
        let lambda = solve_linear(&system.matrix, &adjoint_rhs)?;

        let cn_weights: Vec<f64> = (0..n_atoms)
            .map(|i| {
                let cn = system.cn.cn[i];
                if cn > 0.0 {
                    lambda[i] * element_data[i].kcn * 0.5 / cn.sqrt()
                } else {
                    0.0
                }
            })
            .collect();
        let mut gradient = system
            .cn
            .derivatives
            .as_ref()
            .map_or_else(|| vec![[0.0; 3]; n_atoms], |d| d.contract(&cn_weights));

        for i in 0..n_atoms {
            for j in 0..i {
                let (r, rij) = distance(positions[i], positions[j]);
                if r <= DISTANCE_EPSILON {
                    continue;
                }
                let gamma = coulomb::pair_exponent(element_data[i].rad, element_data[j].rad);
                let dg = coulomb::gaussian_interaction_derivative(r, gamma);
                let scale = -(lambda[i] * charges[j] + lambda[j] * charges[i]) * dg / r;
                axpy(&mut gradient[i], scale, rij);
                axpy(&mut gradient[j], -scale, rij);
            }
        }

        Ok(gradient)
    }

    fn validate(&self, species: &[u8], positions: &[[f64; 3]]) -> Result<(), DispersionError> {
        if species.is_empty() {
            return Err(DispersionError::NoAtoms);
        }
        DispersionError::check_len("positions", species.len(), positions.len())
    }

    /// Retrieves the EEQ parameters for each atom.
    fn fetch_element_data(&self, species: &[u8]) -> Result<Vec<&'p EeqParameters>, DispersionError> {
        species
            .iter()
            .map(|&z| self.parameters.element(z).map(|e| &e.eeq))
            .collect()
    }

    /// Builds the bordered EEQ matrix and right-hand side.
    fn build_system(
        &self,
        species: &[u8],
        positions: &[[f64; 3]],
        element_data: &[&'p EeqParameters],
        total_charge: f64,
        with_derivatives: bool,
    ) -> Result<LinearSystem, DispersionError> {
        let n_atoms = species.len();
        let matrix_size = n_atoms + 1;

        let covalent_radii = self.parameters.covalent_radii(species)?;
        let cn = ncoord::coordination_number(
            species,
            positions,
            &covalent_radii,
            self.options.cutoff,
            &ErfCount {
                kcn: self.options.kcn,
            },
            Some(self.options.cn_max),
            with_derivatives,
        )?;

        let mut matrix = Mat::zeros(matrix_size, matrix_size);
        let mut rhs = Col::zeros(matrix_size);

        for i in 0..n_atoms {
            let data_i = element_data[i];
            matrix[(i, i)] = data_i.eta + coulomb::self_interaction(data_i.rad);
            rhs[i] = -data_i.chi + data_i.kcn * cn.cn[i].sqrt();
        }

        let mat_view = UnsafeMatView {
            ptr: matrix.as_ptr_mut(),
            row_stride: matrix.row_stride(),
            col_stride: matrix.col_stride(),
        };

        (0..n_atoms).into_par_iter().for_each(|i| {
            let data_i = element_data[i];
            for j in (i + 1)..n_atoms {
                let (r, _) = distance(positions[i], positions[j]);
                let gamma = coulomb::pair_exponent(data_i.rad, element_data[j].rad);
                let value = coulomb::gaussian_interaction(r, gamma);

                // SAFETY: Each unordered pair (i, j) with i < j is handled only by the thread for i.
                // That thread writes (i, j) and (j, i), so no two threads write the same entries.
                unsafe {
                    mat_view.write(i, j, value);
                    mat_view.write(j, i, value);
                }
            }
        });

        matrix
            .col_mut(matrix_size - 1)
            .subrows_mut(0, n_atoms)
            .fill(1.0);
        matrix
            .row_mut(matrix_size - 1)
            .subcols_mut(0, n_atoms)
            .fill(1.0);

        rhs[matrix_size - 1] = total_charge;

        Ok(LinearSystem { matrix, rhs, cn })
    }
}

/// The bordered EEQ system of one geometry.
struct LinearSystem {
    matrix: Mat<f64>,
    rhs: Col<f64>,
    cn: CoordinationNumbers,
}

fn solve_linear(matrix: &Mat<f64>, rhs: &Col<f64>) -> Result<Col<f64>, DispersionError> {
    let solve_result = panic::catch_unwind(AssertUnwindSafe(|| matrix.partial_piv_lu().solve(rhs)));

    let solution = match solve_result {
        Ok(sol) => sol,
        Err(_) => {
            return Err(DispersionError::LinalgError(
                "Linear system solver panicked. Matrix might be singular.".to_string(),
            ));
        }
    };

    if solution.as_ref().iter().any(|x: &f64| !x.is_finite()) {
        return Err(DispersionError::LinalgError(
            "Linear system produced non-finite charges. Matrix might be singular.".to_string(),
        ));
    }

    Ok(solution)
}
