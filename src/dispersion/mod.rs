//! Dispersion terms and the orchestrator that evaluates them.
//!
//! The orchestrator resolves the model for a system's species, fills in default radii,
//! computes the D4 coordination numbers, obtains charges if a registered term needs them
//! and sums the atom-resolved contributions of every term. With a gradient requested, the
//! explicit position derivatives of the terms are completed with the coordination-number
//! chain and, for internally computed charges, the EEQ charge response.

mod threebody;
mod twobody;

pub use threebody::ThreeBody;
pub use twobody::TwoBody;

use crate::charges::{EeqModel, EeqOptions};
use crate::damping::{Damping, DampingParameters};
use crate::error::DispersionError;
use crate::math::constants::{CUTOFF_CN, CUTOFF_CN_EEQ, CUTOFF_DISP2, CUTOFF_DISP3};
use crate::math::axpy;
use crate::model::{DispersionModel, ModelKind, ModelOptions};
use crate::ncoord::CnFunction;
use crate::params::ReferenceData;
use crate::types::{AtomicSystem, DispersionResult};
use faer::Mat;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Real-space cutoffs in Bohr.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cutoff {
    /// Coordination number of the dispersion model.
    pub cn: f64,
    /// Coordination number of the EEQ charge model.
    pub cn_eeq: f64,
    /// Two-body dispersion.
    pub disp2: f64,
    /// Three-body dispersion.
    pub disp3: f64,
}

impl Default for Cutoff {
    fn default() -> Self {
        Self {
            cn: CUTOFF_CN,
            cn_eeq: CUTOFF_CN_EEQ,
            disp2: CUTOFF_DISP2,
            disp3: CUTOFF_DISP3,
        }
    }
}

/// Everything a term sees of one system.
pub struct TermInput<'a> {
    pub species: &'a [u8],
    pub positions: &'a [[f64; 3]],
    pub params: &'a DampingParameters,
    pub cn: &'a [f64],
    pub model: &'a dyn DispersionModel,
    pub charges: Option<&'a [f64]>,
    pub r4r2: &'a [f64],
    /// Pairwise van-der-Waals radii in Bohr.
    pub rvdw: &'a Mat<f64>,
    pub cutoff: &'a Cutoff,
    pub with_gradient: bool,
}

/// Partial derivatives of a term's energy.
#[derive(Debug, Clone, PartialEq)]
pub struct TermGradient {
    /// `dE/dr` at fixed coordination numbers and charges.
    pub positions: Vec<[f64; 3]>,
    /// `dE/dcn`.
    pub cn: Vec<f64>,
    /// `dE/dq`.
    pub charges: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermOutput {
    pub energies: Vec<f64>,
    pub gradient: Option<TermGradient>,
}

/// One additive contribution to the dispersion energy.
pub trait DispersionTerm: Send + Sync + fmt::Debug {
    /// Name used to deregister the term.
    fn name(&self) -> &str;

    /// Whether the term needs atomic partial charges.
    fn charge_dependent(&self) -> bool;

    /// Atom-resolved energy of the term and, if requested, its partial derivatives.
    fn calculate(&self, input: &TermInput<'_>) -> Result<TermOutput, DispersionError>;
}

/// Chains `dE/dC6` through the weights: `sum_j (dE/dC6_kj + dE/dC6_jk) dC6_kj/dx_k`.
pub(crate) fn chain_c6(
    model: &dyn DispersionModel,
    species: &[u8],
    weights: &Mat<f64>,
    dweights: &Mat<f64>,
    de_dc6: &Mat<f64>,
) -> Result<Vec<f64>, DispersionError> {
    let dc6 = model.atomic_c6_derivative(species, weights, dweights)?;
    let n_atoms = species.len();
    Ok((0..n_atoms)
        .map(|k| {
            (0..n_atoms)
                .map(|j| (de_dc6[(k, j)] + de_dc6[(j, k)]) * dc6[(k, j)])
                .sum()
        })
        .collect())
}

/// Per-call inputs beyond the geometry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalculationOptions {
    /// Atomic partial charges; computed with EEQ when absent and needed.
    pub charges: Option<Vec<f64>>,
    /// Covalent radii in Bohr, overriding the D3 radii of the reference data.
    pub covalent_radii: Option<Vec<f64>>,
    /// Overrides the tabulated `r4r2` values.
    pub r4r2: Option<Vec<f64>>,
    /// Pairwise van-der-Waals radii in Bohr.
    pub rvdw: Option<Mat<f64>>,
    pub cutoff: Cutoff,
    pub with_gradient: bool,
}

/// Where the orchestrator gets its model from.
#[derive(Debug, Clone)]
enum ModelSource {
    Kind(ModelKind, ModelOptions),
    Instance(Arc<dyn DispersionModel>),
}

/// Evaluates the registered dispersion terms for molecular systems.
///
/// # Examples
///
/// ```
/// use dftd4::{get_default_parameters, get_default_reference, AtomicSystem, Dispersion};
///
/// let dispersion = Dispersion::new(get_default_reference());
/// let params = get_default_parameters().get("pbe").unwrap();
///
/// let system = AtomicSystem::new(
///     vec![8, 1, 1],
///     vec![[0.0, 0.0, -0.1294], [0.0, -1.4941, 1.0274], [0.0, 1.4941, 1.0274]],
///     0.0,
/// );
/// let result = dispersion.calculate(&system, &params).unwrap();
/// assert!(result.energy() < 0.0);
/// ```
#[derive(Debug)]
pub struct Dispersion<'p> {
    reference: &'p ReferenceData,
    terms: Vec<Box<dyn DispersionTerm>>,
    model: ModelSource,
    coordination: CnFunction,
    /// One model per distinct species set, dropped wholesale once `cache_capacity` is hit.
    cache: RwLock<HashMap<Vec<u8>, Arc<dyn DispersionModel>>>,
    cache_capacity: usize,
}

/// Number of species sets whose models are kept before the cache is emptied.
pub const DEFAULT_MODEL_CACHE_CAPACITY: usize = 64;

impl<'p> Dispersion<'p> {
    /// D4 with the rational-damped two-body and three-body terms registered.
    pub fn new(reference: &'p ReferenceData) -> Self {
        let mut dispersion = Self::without_terms(reference);
        dispersion.register(Box::new(TwoBody::new(Damping::Rational)));
        dispersion.register(Box::new(ThreeBody::new(Damping::Rational)));
        dispersion
    }

    /// D4 without any registered term.
    pub fn without_terms(reference: &'p ReferenceData) -> Self {
        Self {
            reference,
            terms: Vec::new(),
            model: ModelSource::Kind(ModelKind::default(), ModelOptions::default()),
            coordination: CnFunction::default(),
            cache: RwLock::new(HashMap::new()),
            cache_capacity: DEFAULT_MODEL_CACHE_CAPACITY,
        }
    }

    /// Selects the model by key; models are built lazily per species set.
    pub fn with_model(mut self, kind: ModelKind, options: ModelOptions) -> Self {
        self.model = ModelSource::Kind(kind, options);
        self.clear_cache();
        self
    }

    /// Uses a pre-built model for every calculation.
    pub fn with_model_instance(mut self, model: Arc<dyn DispersionModel>) -> Self {
        if let ModelSource::Kind(_, options) = &self.model {
            if *options != ModelOptions::default() {
                warn!("A model instance was supplied; the configured model options are ignored.");
            }
        }
        self.model = ModelSource::Instance(model);
        self.clear_cache();
        self
    }

    /// Replaces the coordination number that feeds the reference weights.
    ///
    /// The default is the electronegativity-weighted error-function count of D4.
    pub fn with_coordination_number(mut self, coordination: CnFunction) -> Self {
        self.coordination = coordination;
        self
    }

    /// Limits the number of cached models. Zero disables caching.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self.clear_cache();
        self
    }

    pub fn coordination_number(&self) -> &CnFunction {
        &self.coordination
    }

    pub fn register(&mut self, term: Box<dyn DispersionTerm>) {
        self.terms.push(term);
    }

    /// Removes the first term with the given name and returns it.
    pub fn deregister(&mut self, name: &str) -> Option<Box<dyn DispersionTerm>> {
        let position = self.terms.iter().position(|t| t.name() == name)?;
        Some(self.terms.remove(position))
    }

    pub fn term_names(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.name()).collect()
    }

    /// Drops every cached model.
    pub fn clear_cache(&self) {
        match self.cache.write() {
            Ok(mut cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Number of models currently held in the cache.
    pub fn cached_models(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// The model for a species list, built on first use and cached by species set.
    ///
    /// Every new species set adds an entry; when the cache holds `cache_capacity` models
    /// it is emptied before the next insertion.
    pub fn model_for(&self, species: &[u8]) -> Result<Arc<dyn DispersionModel>, DispersionError> {
        let (kind, options) = match &self.model {
            ModelSource::Instance(model) => {
                let covered = model.atomic_numbers();
                if let Some(&z) = species.iter().find(|z| !covered.contains(z)) {
                    return Err(DispersionError::SpeciesNotInModel(z));
                }
                return Ok(Arc::clone(model));
            }
            ModelSource::Kind(kind, options) => (*kind, *options),
        };

        let mut key = species.to_vec();
        key.sort_unstable();
        key.dedup();

        {
            let cache = self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(model) = cache.get(&key) {
                debug!("Reusing cached model for species {:?}", key);
                return Ok(Arc::clone(model));
            }
        }

        let model = kind.build(&key, self.reference, options)?;
        if self.cache_capacity == 0 {
            return Ok(model);
        }
        let mut cache = self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if cache.len() >= self.cache_capacity && !cache.contains_key(&key) {
            debug!("Model cache reached {} entries, clearing", cache.len());
            cache.clear();
        }
        Ok(Arc::clone(cache.entry(key).or_insert(model)))
    }

    /// Atom-resolved dispersion energy of a system.
    pub fn calculate(
        &self,
        system: &AtomicSystem,
        params: &DampingParameters,
    ) -> Result<DispersionResult, DispersionError> {
        self.calculate_with(system, params, &CalculationOptions::default())
    }

    /// Evaluates independent systems in parallel.
    ///
    /// Every system is evaluated exactly as [`Dispersion::calculate`] would; the first
    /// error aborts the batch.
    pub fn calculate_batch(
        &self,
        systems: &[AtomicSystem],
        params: &DampingParameters,
    ) -> Result<Vec<DispersionResult>, DispersionError> {
        systems
            .par_iter()
            .map(|system| self.calculate(system, params))
            .collect()
    }

    /// Atom-resolved dispersion energy with explicit per-call options.
    ///
    /// # Errors
    ///
    /// * `NoAtoms` or `ShapeMismatch` for inconsistent inputs, before any computation.
    /// * `UnusedCharges` if charges are given but no registered term depends on them.
    /// * Model construction and charge solver errors.
    pub fn calculate_with(
        &self,
        system: &AtomicSystem,
        params: &DampingParameters,
        options: &CalculationOptions,
    ) -> Result<DispersionResult, DispersionError> {
        let species = system.species.as_slice();
        let positions = system.positions.as_slice();
        let n_atoms = species.len();
        if n_atoms == 0 {
            return Err(DispersionError::NoAtoms);
        }
        DispersionError::check_len("positions", n_atoms, positions.len())?;

        let model = self.model_for(species)?;

        let r4r2 = match &options.r4r2 {
            Some(values) => values.clone(),
            None => self.reference.r4r2(species)?,
        };
        DispersionError::check_len("r4r2 expectation values", n_atoms, r4r2.len())?;

        let rcov = match &options.covalent_radii {
            Some(values) => values.clone(),
            None => self.reference.covalent_radii(species)?,
        };
        DispersionError::check_len("covalent radii", n_atoms, rcov.len())?;

        let rvdw = match &options.rvdw {
            Some(values) => values.clone(),
            None => self.reference.pairwise_vdw_radii(species)?,
        };
        DispersionError::check_len("van der Waals radii", n_atoms, rvdw.nrows())?;
        DispersionError::check_len("van der Waals radii", n_atoms, rvdw.ncols())?;

        let charge_dependent = self.terms.iter().any(|t| t.charge_dependent());
        if let Some(q) = &options.charges {
            if !charge_dependent {
                return Err(DispersionError::UnusedCharges);
            }
            DispersionError::check_len("charges", n_atoms, q.len())?;
        }

        let electronegativities = self.reference.electronegativities(species)?;
        let cn = self.coordination.compute(
            species,
            positions,
            &rcov,
            &electronegativities,
            options.cutoff.cn,
            options.with_gradient,
        )?;

        let eeq = EeqModel::new(self.reference).with_options(EeqOptions {
            cutoff: options.cutoff.cn_eeq,
            ..Default::default()
        });
        let charges = match &options.charges {
            Some(q) => Some(q.clone()),
            None if charge_dependent => {
                debug!("Computing EEQ charges for {} atoms", n_atoms);
                Some(eeq.solve(species, positions, system.charge)?.charges)
            }
            None => None,
        };

        let input = TermInput {
            species,
            positions,
            params,
            cn: &cn.cn,
            model: model.as_ref(),
            charges: charges.as_deref(),
            r4r2: &r4r2,
            rvdw: &rvdw,
            cutoff: &options.cutoff,
            with_gradient: options.with_gradient,
        };

        let mut energies = vec![0.0; n_atoms];
        let mut explicit = vec![[0.0; 3]; n_atoms];
        let mut de_dcn = vec![0.0; n_atoms];
        let mut de_dq = vec![0.0; n_atoms];

        for term in &self.terms {
            let output = term.calculate(&input)?;
            for (total, value) in energies.iter_mut().zip(&output.energies) {
                *total += value;
            }
            if let Some(gradient) = output.gradient {
                for (total, value) in explicit.iter_mut().zip(&gradient.positions) {
                    axpy(total, 1.0, *value);
                }
                for (total, value) in de_dcn.iter_mut().zip(&gradient.cn) {
                    *total += value;
                }
                for (total, value) in de_dq.iter_mut().zip(&gradient.charges) {
                    *total += value;
                }
            }
        }

        if !options.with_gradient {
            return Ok(DispersionResult {
                energies,
                gradient: None,
                charge_derivative: None,
            });
        }

        let mut gradient = explicit;
        if let Some(derivatives) = cn.derivatives.as_ref() {
            for (total, value) in gradient.iter_mut().zip(derivatives.contract(&de_dcn)) {
                axpy(total, 1.0, value);
            }
        }

        let charge_derivative = if options.charges.is_some() {
            Some(de_dq)
        } else {
            if let Some(q) = charges.as_deref() {
                let response = eeq.charge_response(species, positions, q, &de_dq)?;
                for (total, value) in gradient.iter_mut().zip(response) {
                    axpy(total, 1.0, value);
                }
            }
            None
        };

        Ok(DispersionResult {
            energies,
            gradient: Some(gradient),
            charge_derivative,
        })
    }
}
