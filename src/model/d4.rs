//! The D4 model: Gaussian reference weighting with charge scaling.

use super::reference::{ReferenceSet, SpeciesReferences};
use super::{DispersionModel, ModelOptions, Precision, ReferenceWeights};
use crate::error::DispersionError;
use crate::math::constants::{NFREQ, TINY_NORM};
use crate::params::ReferenceData;
use faer::Mat;
use log::debug;
use rayon::prelude::*;

/// D4 dispersion model for a fixed set of species.
///
/// # Examples
///
/// ```
/// use dftd4::{get_default_reference, D4Model, DispersionModel};
///
/// let species = [14, 1, 1, 1, 1];
/// let model = D4Model::new(&species, get_default_reference()).unwrap();
///
/// let cn = [3.9, 0.97, 0.97, 0.97, 0.97];
/// let weights = model.weight_references(&species, &cn, None).unwrap();
/// let c6 = model.atomic_c6(&species, &weights).unwrap();
/// assert!(c6[(0, 1)] > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct D4Model {
    references: ReferenceSet,
    options: ModelOptions,
}

impl D4Model {
    /// Builds the model for the distinct species of `species`.
    ///
    /// # Errors
    ///
    /// Returns `DispersionError::ParameterNotFound` if `data` lacks one of the species.
    pub fn new(species: &[u8], data: &ReferenceData) -> Result<Self, DispersionError> {
        let references = ReferenceSet::new(species, data)?;
        debug!(
            "Built D4 model for species {:?} with up to {} reference states",
            references.atomic_numbers(),
            references.max_refs()
        );
        Ok(Self {
            references,
            options: ModelOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the model converted to another working precision.
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.options.precision = precision;
        self
    }

    /// Number of reference slots per atom, i.e. the column count of the weights.
    pub fn max_references(&self) -> usize {
        self.references.max_refs()
    }

    /// Normalised Gaussian weights before charge scaling.
    ///
    /// Active entries of an atom sum to one unless the weighting collapsed numerically,
    /// in which case the states at the largest reference CN get weight one.
    pub fn gaussian_weights(
        &self,
        species: &[u8],
        cn: &[f64],
        with_dcn: bool,
    ) -> Result<ReferenceWeights, DispersionError> {
        DispersionError::check_len("coordination numbers", species.len(), cn.len())?;
        let idx = self.references.map_atoms(species)?;
        let m = self.references.max_refs();

        let mut weights = Mat::zeros(species.len(), m);
        let mut dcn = with_dcn.then(|| Mat::zeros(species.len(), m));
        for (i, &sp) in idx.iter().enumerate() {
            let refs = self.references.get(sp);
            let (gw, dgw) = self.gaussian_row(refs, cn[i], with_dcn);
            for a in 0..m {
                weights[(i, a)] = gw[a];
            }
            if let Some(dcn) = dcn.as_mut() {
                for a in 0..m {
                    dcn[(i, a)] = dgw[a];
                }
            }
        }

        Ok(ReferenceWeights {
            weights,
            dcn,
            dq: None,
        })
    }

    /// Weights of one atom over all padded slots, and their CN derivative.
    fn gaussian_row(&self, refs: &SpeciesReferences, cn: f64, with_dcn: bool) -> (Vec<f64>, Vec<f64>) {
        let m = self.references.max_refs();
        let wf = self.options.wf;
        let precision = self.options.precision;

        let mut expw = vec![0.0; m];
        let mut dexpw = vec![0.0; m];
        for a in 0..refs.len() {
            let delta = cn - refs.cn[a];
            let tmp = (-delta * delta).exp();
            for k in 1..=refs.multiplicity[a] {
                let scale = k as f64 * wf;
                let value = tmp.powf(scale);
                expw[a] += value;
                dexpw[a] -= 2.0 * scale * delta * value;
            }
        }

        let norm_active: f64 = expw.iter().sum();
        let dnorm: f64 = dexpw.iter().sum();
        let max_cn = refs.max_cn();

        let mut gw = vec![0.0; m];
        let mut dgw = if with_dcn { vec![0.0; m] } else { Vec::new() };
        for a in 0..m {
            let active = a < refs.len();
            let norm = if active { norm_active } else { TINY_NORM };

            let value = precision.round(expw[a] / norm);
            gw[a] = if value.is_finite() {
                value
            } else if active && refs.cn[a] == max_cn {
                1.0
            } else {
                0.0
            };

            if with_dcn {
                let derivative = (dexpw[a] - expw[a] * dnorm / norm) / norm;
                dgw[a] = if derivative.is_finite() {
                    precision.round(derivative)
                } else {
                    0.0
                };
            }
        }
        (gw, dgw)
    }
}

/// Charge scaling of the weights.
#[inline]
fn zeta(ga: f64, gam: f64, qref: f64, qmod: f64) -> f64 {
    if qmod > 0.0 {
        (ga * (1.0 - (gam * (1.0 - qref / qmod)).exp())).exp()
    } else {
        ga.exp()
    }
}

/// Derivative of [`zeta`] with respect to `qmod`.
#[inline]
fn dzeta(ga: f64, gam: f64, qref: f64, qmod: f64) -> f64 {
    if qmod > 0.0 {
        let scale = (gam * (1.0 - qref / qmod)).exp();
        -ga * gam * scale * zeta(ga, gam, qref, qmod) * qref / (qmod * qmod)
    } else {
        0.0
    }
}

impl DispersionModel for D4Model {
    fn name(&self) -> &'static str {
        "d4"
    }

    fn atomic_numbers(&self) -> Vec<u8> {
        self.references.atomic_numbers()
    }

    fn options(&self) -> &ModelOptions {
        &self.options
    }

    fn weight_references_with_gradients(
        &self,
        species: &[u8],
        cn: &[f64],
        charges: Option<&[f64]>,
        with_dcn: bool,
        with_dq: bool,
    ) -> Result<ReferenceWeights, DispersionError> {
        if let Some(q) = charges {
            DispersionError::check_len("charges", species.len(), q.len())?;
        }
        let gaussian = self.gaussian_weights(species, cn, with_dcn)?;
        let idx = self.references.map_atoms(species)?;

        let m = self.references.max_refs();
        let n = species.len();
        let ModelOptions {
            ga,
            gc,
            ref_charges,
            precision,
            ..
        } = self.options;

        let mut weights = Mat::zeros(n, m);
        let mut dcn = with_dcn.then(|| Mat::zeros(n, m));
        let mut dq = with_dq.then(|| Mat::zeros(n, m));

        for (i, &sp) in idx.iter().enumerate() {
            let refs = self.references.get(sp);
            let refq = refs.charges(ref_charges);
            let gam = refs.hardness * gc;
            let qmod = charges.map_or(0.0, |q| q[i]) + refs.zeff;

            for a in 0..refs.len() {
                let qref = refq[a] + refs.zeff;
                let scale = zeta(ga, gam, qref, qmod);
                let gw = gaussian.weights[(i, a)];

                weights[(i, a)] = precision.round(scale * gw);
                if let (Some(dcn), Some(dgw)) = (dcn.as_mut(), gaussian.dcn.as_ref()) {
                    dcn[(i, a)] = precision.round(scale * dgw[(i, a)]);
                }
                if let Some(dq) = dq.as_mut() {
                    dq[(i, a)] = precision.round(dzeta(ga, gam, qref, qmod) * gw);
                }
            }
        }

        Ok(ReferenceWeights { weights, dcn, dq })
    }

    fn atomic_c6(&self, species: &[u8], weights: &Mat<f64>) -> Result<Mat<f64>, DispersionError> {
        self.contract(species, weights, weights)
    }

    fn atomic_c6_derivative(
        &self,
        species: &[u8],
        weights: &Mat<f64>,
        dweights: &Mat<f64>,
    ) -> Result<Mat<f64>, DispersionError> {
        self.contract(species, dweights, weights)
    }

    fn weighted_polarizabilities(
        &self,
        species: &[u8],
        weights: &Mat<f64>,
    ) -> Result<Vec<[f64; NFREQ]>, DispersionError> {
        self.check_weights(species, weights)?;
        let idx = self.references.map_atoms(species)?;

        Ok(idx
            .iter()
            .enumerate()
            .map(|(i, &sp)| {
                let refs = self.references.get(sp);
                let mut alpha = [0.0; NFREQ];
                for (a, curve) in refs.alpha.iter().enumerate() {
                    let w = weights[(i, a)];
                    for (out, value) in alpha.iter_mut().zip(curve) {
                        *out += w * value;
                    }
                }
                alpha
            })
            .collect())
    }
}

impl D4Model {
    fn check_weights(&self, species: &[u8], weights: &Mat<f64>) -> Result<(), DispersionError> {
        DispersionError::check_len("reference weights", species.len(), weights.nrows())?;
        DispersionError::check_len(
            "reference weight columns",
            self.references.max_refs(),
            weights.ncols(),
        )
    }

    /// `out_ij = sum_ab left_ia right_jb C6_ref(i, j, a, b)`.
    fn contract(
        &self,
        species: &[u8],
        left: &Mat<f64>,
        right: &Mat<f64>,
    ) -> Result<Mat<f64>, DispersionError> {
        self.check_weights(species, left)?;
        self.check_weights(species, right)?;
        let idx = self.references.map_atoms(species)?;
        let n = idx.len();
        let m = self.references.max_refs();

        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let block = self.references.rc6(idx[i], idx[j]);
                        let mut c6 = 0.0;
                        for a in 0..m {
                            let wa = left[(i, a)];
                            if wa == 0.0 {
                                continue;
                            }
                            for b in 0..m {
                                c6 += wa * right[(j, b)] * block[a * m + b];
                            }
                        }
                        c6
                    })
                    .collect()
            })
            .collect();

        Ok(Mat::from_fn(n, n, |i, j| rows[i][j]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::get_default_reference;
    use crate::model::RefCharges;
    use crate::model::reference::{casimir_polder, trapezoid_weights};
    use approx::assert_relative_eq;

    fn model(species: &[u8]) -> D4Model {
        D4Model::new(species, get_default_reference()).unwrap()
    }

    #[test]
    fn test_weights_are_normalised_within_reference_range() {
        let species = [1, 3, 6, 7, 8, 9, 14, 15, 16, 17];
        let model = model(&species);
        for &cn in &[0.0, 0.4, 1.0, 1.7, 2.5, 3.0] {
            let cns = vec![cn; species.len()];
            let gw = model.gaussian_weights(&species, &cns, false).unwrap().weights;
            for i in 0..species.len() {
                let mut sum = 0.0;
                for a in 0..model.max_references() {
                    assert!(gw[(i, a)] >= 0.0);
                    sum += gw[(i, a)];
                }
                assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_inactive_slots_are_zero() {
        let species = [1, 14];
        let model = model(&species);
        let w = model
            .weight_references_with_gradients(&species, &[1.0, 4.0], Some(&[0.1, -0.2]), true, true)
            .unwrap();
        for a in 2..model.max_references() {
            assert_eq!(w.weights[(0, a)], 0.0);
            assert_eq!(w.dcn.as_ref().unwrap()[(0, a)], 0.0);
            assert_eq!(w.dq.as_ref().unwrap()[(0, a)], 0.0);
        }
    }

    #[test]
    fn test_collapse_falls_back_to_highest_reference() {
        let species = [6];
        let model = model(&species);
        let w = model.gaussian_weights(&species, &[50.0], true).unwrap();
        assert_eq!(w.weights[(0, 4)], 1.0);
        for a in 0..4 {
            assert_eq!(w.weights[(0, a)], 0.0);
        }
        for a in 0..5 {
            assert_eq!(w.dcn.as_ref().unwrap()[(0, a)], 0.0);
        }
    }

    #[test]
    fn test_tied_highest_references_all_keep_unit_weight() {
        let alpha = format!("{:?}", vec![1.0; NFREQ]);
        let mut toml_str = String::from(
            "[elements.C]\nrcov = 0.75\nr4r2 = 3.1\nen = 2.55\ngam = 0.42\nzeff = 6.0\nrvdw = 1.7\n\
             eeq = { chi = 1.2, eta = 0.1, kcn = 0.1, rad = 1.0 }\n",
        );
        for cn in ["0.0", "2.0", "2.0"] {
            toml_str.push_str(&format!(
                "\n[[elements.C.refs]]\ncn = {cn}\nq_eeq = 0.0\nq_gfn2 = 0.0\nalpha = {alpha}\n"
            ));
        }
        let data = ReferenceData::load_from_str(&toml_str).unwrap();
        let model = D4Model::new(&[6], &data).unwrap();

        let w = model.weight_references(&[6], &[50.0], None).unwrap();
        assert_eq!(w[(0, 0)], 0.0);
        assert_eq!(w[(0, 1)], 1.0);
        assert_eq!(w[(0, 2)], 1.0);
    }

    #[test]
    fn test_cn_derivative_matches_finite_differences() {
        let species = [1, 6, 7, 8, 14, 17];
        let model = model(&species);
        let charges = [0.05, -0.1, -0.3, 0.2, 0.4, -0.15];
        let h = 1e-6;

        for &cn in &[0.0, 0.5, 0.9118, 1.3, 1.9985, 2.4, 2.9897, 3.5, 3.9844] {
            let cns = vec![cn; species.len()];
            let w = model
                .weight_references_with_gradients(&species, &cns, Some(&charges), true, false)
                .unwrap();
            let plus = model
                .weight_references(&species, &vec![cn + h; species.len()], Some(&charges))
                .unwrap();
            let minus = model
                .weight_references(&species, &vec![cn - h; species.len()], Some(&charges))
                .unwrap();
            let dcn = w.dcn.unwrap();

            for i in 0..species.len() {
                for a in 0..model.max_references() {
                    let numerical = (plus[(i, a)] - minus[(i, a)]) / (2.0 * h);
                    assert_relative_eq!(dcn[(i, a)], numerical, epsilon = 1e-6, max_relative = 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_charge_derivative_matches_finite_differences() {
        let species = [3, 7, 8, 17];
        let model = model(&species);
        let cns = [0.8, 2.6, 1.2, 0.9];
        let h = 1e-6;

        for &q in &[-0.6, -0.2, 0.0, 0.3, 0.7] {
            let charges = vec![q; species.len()];
            let w = model
                .weight_references_with_gradients(&species, &cns, Some(&charges), false, true)
                .unwrap();
            let plus = model
                .weight_references(&species, &cns, Some(&vec![q + h; species.len()]))
                .unwrap();
            let minus = model
                .weight_references(&species, &cns, Some(&vec![q - h; species.len()]))
                .unwrap();
            let dq = w.dq.unwrap();

            for i in 0..species.len() {
                for a in 0..model.max_references() {
                    let numerical = (plus[(i, a)] - minus[(i, a)]) / (2.0 * h);
                    assert_relative_eq!(dq[(i, a)], numerical, epsilon = 1e-6, max_relative = 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_neutral_hydrocarbons_are_not_scaled() {
        let species = [6, 1];
        let model = model(&species);
        let cns = [3.2, 0.95];
        let scaled = model.weight_references(&species, &cns, Some(&[0.0, 0.0])).unwrap();
        let gaussian = model.gaussian_weights(&species, &cns, false).unwrap().weights;
        for i in 0..2 {
            for a in 0..model.max_references() {
                assert_relative_eq!(scaled[(i, a)], gaussian[(i, a)], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_missing_charges_count_as_zero() {
        let species = [7, 1, 1, 1];
        let model = model(&species);
        let cns = [2.9, 0.99, 0.99, 0.99];
        let implicit = model.weight_references(&species, &cns, None).unwrap();
        let explicit = model.weight_references(&species, &cns, Some(&[0.0; 4])).unwrap();
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_reference_charge_source_changes_weights() {
        let species = [7];
        let eeq = model(&species);
        let gfn2 = model(&species).with_options(ModelOptions {
            ref_charges: RefCharges::Gfn2,
            ..Default::default()
        });
        let a = eeq.weight_references(&species, &[1.0], Some(&[-0.3])).unwrap();
        let b = gfn2.weight_references(&species, &[1.0], Some(&[-0.3])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_single_precision_rounds_weights() {
        let species = [6, 8];
        let cns = [2.7, 1.1];
        let double = model(&species);
        let single = model(&species).with_precision(Precision::Single);
        let wd = double.weight_references(&species, &cns, None).unwrap();
        let ws = single.weight_references(&species, &cns, None).unwrap();
        for i in 0..2 {
            for a in 0..double.max_references() {
                assert_eq!(ws[(i, a)], ws[(i, a)] as f32 as f64);
                assert_relative_eq!(ws[(i, a)], wd[(i, a)], max_relative = 1e-6, epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn test_c6_is_symmetric_for_homonuclear_pair() {
        let species = [6, 6];
        let model = model(&species);
        let w = model.weight_references(&species, &[1.0, 3.0], None).unwrap();
        let c6 = model.atomic_c6(&species, &w).unwrap();
        assert_relative_eq!(c6[(0, 1)], c6[(1, 0)], max_relative = 1e-14);
        assert!(c6[(0, 0)] > 0.0);
    }

    #[test]
    fn test_c6_matches_casimir_polder_of_weighted_polarizabilities() {
        let species = [8, 1, 1];
        let model = model(&species);
        let w = model
            .weight_references(&species, &[1.6, 0.8, 0.8], Some(&[-0.6, 0.3, 0.3]))
            .unwrap();
        let c6 = model.atomic_c6(&species, &w).unwrap();
        let alpha = model.weighted_polarizabilities(&species, &w).unwrap();
        let tw = trapezoid_weights();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(
                    c6[(i, j)],
                    casimir_polder(&tw, &alpha[i], &alpha[j]),
                    max_relative = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_c6_derivative_matches_finite_differences() {
        let species = [6, 8, 1];
        let model = model(&species);
        let cns = [2.4, 1.3, 0.9];
        let h = 1e-6;

        let w = model
            .weight_references_with_gradients(&species, &cns, None, true, false)
            .unwrap();
        let dc6 = model
            .atomic_c6_derivative(&species, &w.weights, w.dcn.as_ref().unwrap())
            .unwrap();

        for i in 0..3 {
            let mut plus = cns;
            let mut minus = cns;
            plus[i] += h;
            minus[i] -= h;
            let c6p = model
                .atomic_c6(&species, &model.weight_references(&species, &plus, None).unwrap())
                .unwrap();
            let c6m = model
                .atomic_c6(&species, &model.weight_references(&species, &minus, None).unwrap())
                .unwrap();
            for j in 0..3 {
                if j == i {
                    continue;
                }
                let numerical = (c6p[(i, j)] - c6m[(i, j)]) / (2.0 * h);
                assert_relative_eq!(dc6[(i, j)], numerical, epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_errors() {
        let species = [6, 1];
        let model = model(&species);
        assert!(matches!(
            model.weight_references(&[6, 8], &[1.0, 1.0], None),
            Err(DispersionError::SpeciesNotInModel(8))
        ));
        assert!(matches!(
            model.weight_references(&species, &[1.0], None),
            Err(DispersionError::ShapeMismatch { quantity: "coordination numbers", .. })
        ));
        assert!(matches!(
            model.weight_references(&species, &[1.0, 1.0], Some(&[0.0; 3])),
            Err(DispersionError::ShapeMismatch { quantity: "charges", .. })
        ));
        let w = Mat::zeros(2, 3);
        assert!(matches!(
            model.atomic_c6(&species, &w),
            Err(DispersionError::ShapeMismatch { .. })
        ));
    }
}
