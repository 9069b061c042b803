//! Dispersion models: reference weighting and C6 coefficients.
//!
//! A model is built once for a set of species and then evaluated for any geometry made
//! of those species. [`ModelKind::build`] is the single place where a model key turns
//! into an implementation.

mod d4;
mod reference;

pub use d4::D4Model;

use crate::error::DispersionError;
use crate::math::constants::{GA_DEFAULT, GC_DEFAULT, NFREQ, WF_DEFAULT};
use crate::params::ReferenceData;
use faer::Mat;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Source of the reference partial charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefCharges {
    #[default]
    Eeq,
    Gfn2,
}

impl FromStr for RefCharges {
    type Err = DispersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eeq" => Ok(RefCharges::Eeq),
            "gfn2" => Ok(RefCharges::Gfn2),
            _ => Err(DispersionError::UnknownReferenceCharges(s.to_string())),
        }
    }
}

impl fmt::Display for RefCharges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefCharges::Eeq => write!(f, "eeq"),
            RefCharges::Gfn2 => write!(f, "gfn2"),
        }
    }
}

/// Working precision of the reference weights.
///
/// Weighting always runs in double precision; the final weights are rounded to the
/// working precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    Single,
    #[default]
    Double,
}

impl Precision {
    #[inline]
    pub fn round(self, value: f64) -> f64 {
        match self {
            Precision::Single => value as f32 as f64,
            Precision::Double => value,
        }
    }
}

/// Configuration scalars of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelOptions {
    /// Sharpness of the Gaussian weighting.
    pub wf: f64,
    /// Height of the charge scaling.
    pub ga: f64,
    /// Steepness of the charge scaling.
    pub gc: f64,
    pub ref_charges: RefCharges,
    pub precision: Precision,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            wf: WF_DEFAULT,
            ga: GA_DEFAULT,
            gc: GC_DEFAULT,
            ref_charges: RefCharges::default(),
            precision: Precision::default(),
        }
    }
}

/// Reference weights of every atom, `n_atoms x max_refs`, with optional derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceWeights {
    pub weights: Mat<f64>,
    /// Derivative with respect to each atom's own coordination number.
    pub dcn: Option<Mat<f64>>,
    /// Derivative with respect to each atom's own partial charge.
    pub dq: Option<Mat<f64>>,
}

/// Operations shared by every dispersion model.
///
/// `species` always lists the atoms of the system being evaluated; every species must be
/// one the model was built for.
pub trait DispersionModel: Send + Sync + fmt::Debug {
    /// Short identifier, e.g. `"d4"`.
    fn name(&self) -> &'static str;

    /// Sorted atomic numbers the model covers.
    fn atomic_numbers(&self) -> Vec<u8>;

    fn options(&self) -> &ModelOptions;

    /// Charge-scaled reference weights. Missing charges count as zero.
    fn weight_references(
        &self,
        species: &[u8],
        cn: &[f64],
        charges: Option<&[f64]>,
    ) -> Result<Mat<f64>, DispersionError> {
        self.weight_references_with_gradients(species, cn, charges, false, false)
            .map(|w| w.weights)
    }

    /// Charge-scaled reference weights together with the requested derivatives.
    fn weight_references_with_gradients(
        &self,
        species: &[u8],
        cn: &[f64],
        charges: Option<&[f64]>,
        with_dcn: bool,
        with_dq: bool,
    ) -> Result<ReferenceWeights, DispersionError>;

    /// Atom-pair C6 coefficients, `sum_ab w_ia w_jb C6_ref(i, j, a, b)`.
    fn atomic_c6(&self, species: &[u8], weights: &Mat<f64>) -> Result<Mat<f64>, DispersionError>;

    /// `sum_ab dw_ia w_jb C6_ref(i, j, a, b)`, the derivative of `C6_ij` through atom `i`.
    fn atomic_c6_derivative(
        &self,
        species: &[u8],
        weights: &Mat<f64>,
        dweights: &Mat<f64>,
    ) -> Result<Mat<f64>, DispersionError>;

    /// Polarizability of every atom on the imaginary-frequency grid.
    fn weighted_polarizabilities(
        &self,
        species: &[u8],
        weights: &Mat<f64>,
    ) -> Result<Vec<[f64; NFREQ]>, DispersionError>;
}

/// Known dispersion model keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelKind {
    #[default]
    D4,
}

impl FromStr for ModelKind {
    type Err = DispersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d4" => Ok(ModelKind::D4),
            _ => Err(DispersionError::UnknownModel(s.to_string())),
        }
    }
}

impl ModelKind {
    /// Constructs the model for the species of a system.
    pub fn build(
        self,
        species: &[u8],
        data: &ReferenceData,
        options: ModelOptions,
    ) -> Result<Arc<dyn DispersionModel>, DispersionError> {
        match self {
            ModelKind::D4 => Ok(Arc::new(D4Model::new(species, data)?.with_options(options))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::get_default_reference;

    #[test]
    fn test_ref_charges_from_str() {
        assert_eq!("EEQ".parse::<RefCharges>().unwrap(), RefCharges::Eeq);
        assert_eq!("gfn2".parse::<RefCharges>().unwrap(), RefCharges::Gfn2);
        assert!(matches!(
            "wrong".parse::<RefCharges>(),
            Err(DispersionError::UnknownReferenceCharges(s)) if s == "wrong"
        ));
    }

    #[test]
    fn test_model_kind_from_str() {
        assert_eq!("D4".parse::<ModelKind>().unwrap(), ModelKind::D4);
        assert!(matches!(
            "d5".parse::<ModelKind>(),
            Err(DispersionError::UnknownModel(s)) if s == "d5"
        ));
    }

    #[test]
    fn test_precision_rounding() {
        let x = 0.1f64;
        assert_eq!(Precision::Double.round(x), x);
        assert_eq!(Precision::Single.round(x), 0.1f32 as f64);
        assert_ne!(Precision::Single.round(x), x);
    }

    #[test]
    fn test_factory_builds_d4() {
        let options = ModelOptions {
            wf: 4.0,
            ..Default::default()
        };
        let model = ModelKind::D4
            .build(&[14, 1, 1, 1, 1], get_default_reference(), options)
            .unwrap();
        assert_eq!(model.name(), "d4");
        assert_eq!(model.atomic_numbers(), vec![1, 14]);
        assert_eq!(model.options().wf, 4.0);
    }
}
