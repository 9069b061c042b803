//! Reference states scoped to the species of one model instance.
//!
//! Every species is padded to the largest reference count of the set; padded slots are
//! inactive and carry zero weight everywhere. The pairwise reference C6 coefficients are
//! integrated once from the polarizabilities when the set is built.

use super::RefCharges;
use crate::error::DispersionError;
use crate::math::constants::{FREQUENCIES, NFREQ};
use crate::params::ReferenceData;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Reference data of one species.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SpeciesReferences {
    pub atomic_number: u8,
    pub cn: Vec<f64>,
    pub q_eeq: Vec<f64>,
    pub q_gfn2: Vec<f64>,
    pub multiplicity: Vec<usize>,
    pub alpha: Vec<[f64; NFREQ]>,
    pub zeff: f64,
    pub hardness: f64,
}

impl SpeciesReferences {
    pub fn len(&self) -> usize {
        self.cn.len()
    }

    pub fn charges(&self, source: RefCharges) -> &[f64] {
        match source {
            RefCharges::Eeq => &self.q_eeq,
            RefCharges::Gfn2 => &self.q_gfn2,
        }
    }

    /// Largest reference CN of the species.
    pub fn max_cn(&self) -> f64 {
        self.cn.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReferenceSet {
    species: Vec<SpeciesReferences>,
    index: HashMap<u8, usize>,
    max_refs: usize,
    /// `rc6[p * nsp + q]` is the `max_refs x max_refs` block of species pair (p, q).
    rc6: Vec<Vec<f64>>,
}

impl ReferenceSet {
    /// Builds the reference set of the distinct species in `species`.
    pub fn new(species: &[u8], data: &ReferenceData) -> Result<Self, DispersionError> {
        let mut unique: Vec<u8> = species.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut references = Vec::with_capacity(unique.len());
        for &z in &unique {
            let element = data.element(z)?;
            let mut alpha = Vec::with_capacity(element.refs.len());
            for (idx, state) in element.refs.iter().enumerate() {
                let curve = <[f64; NFREQ]>::try_from(state.alpha.as_slice()).map_err(|_| {
                    DispersionError::InvalidReference {
                        element: z,
                        detail: format!("reference {} has a malformed polarizability", idx),
                    }
                })?;
                alpha.push(curve);
            }

            references.push(SpeciesReferences {
                atomic_number: z,
                cn: element.refs.iter().map(|r| r.cn).collect(),
                q_eeq: element.refs.iter().map(|r| r.q_eeq).collect(),
                q_gfn2: element.refs.iter().map(|r| r.q_gfn2).collect(),
                multiplicity: element.gaussian_multiplicities(),
                alpha,
                zeff: element.zeff,
                hardness: element.hardness,
            });
        }

        let max_refs = references.iter().map(SpeciesReferences::len).max().unwrap_or(0);
        let index = unique.iter().enumerate().map(|(i, &z)| (z, i)).collect();

        let weights = trapezoid_weights();
        let nsp = references.len();
        let mut rc6 = Vec::with_capacity(nsp * nsp);
        for p in &references {
            for q in &references {
                let mut block = vec![0.0; max_refs * max_refs];
                for (a, alpha_a) in p.alpha.iter().enumerate() {
                    for (b, alpha_b) in q.alpha.iter().enumerate() {
                        block[a * max_refs + b] = casimir_polder(&weights, alpha_a, alpha_b);
                    }
                }
                rc6.push(block);
            }
        }

        Ok(Self {
            species: references,
            index,
            max_refs,
            rc6,
        })
    }

    pub fn max_refs(&self) -> usize {
        self.max_refs
    }

    pub fn atomic_numbers(&self) -> Vec<u8> {
        self.species.iter().map(|s| s.atomic_number).collect()
    }

    /// Index of a species within this set.
    pub fn species_index(&self, atomic_number: u8) -> Result<usize, DispersionError> {
        self.index
            .get(&atomic_number)
            .copied()
            .ok_or(DispersionError::SpeciesNotInModel(atomic_number))
    }

    /// Maps every atom onto its species index.
    pub fn map_atoms(&self, species: &[u8]) -> Result<Vec<usize>, DispersionError> {
        species.iter().map(|&z| self.species_index(z)).collect()
    }

    pub fn get(&self, species_index: usize) -> &SpeciesReferences {
        &self.species[species_index]
    }

    /// Reference C6 block of a species pair, row-major over the reference indices.
    pub fn rc6(&self, p: usize, q: usize) -> &[f64] {
        &self.rc6[p * self.species.len() + q]
    }
}

/// Trapezoidal integration weights of the frequency grid.
pub(crate) fn trapezoid_weights() -> [f64; NFREQ] {
    let mut weights = [0.0; NFREQ];
    for (i, w) in weights.iter_mut().enumerate() {
        let lower = if i > 0 { FREQUENCIES[i] - FREQUENCIES[i - 1] } else { 0.0 };
        let upper = if i + 1 < NFREQ { FREQUENCIES[i + 1] - FREQUENCIES[i] } else { 0.0 };
        *w = 0.5 * (lower + upper);
    }
    weights
}

/// `3/pi * integral alpha_a(iw) alpha_b(iw) dw` on the frequency grid.
pub(crate) fn casimir_polder(weights: &[f64; NFREQ], alpha_a: &[f64; NFREQ], alpha_b: &[f64; NFREQ]) -> f64 {
    let integral: f64 = weights
        .iter()
        .zip(alpha_a.iter().zip(alpha_b))
        .map(|(w, (a, b))| w * a * b)
        .sum();
    3.0 / PI * integral
}
