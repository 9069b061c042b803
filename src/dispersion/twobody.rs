//! Pairwise damped dispersion energy of orders 6, 8 and optionally 10.

use super::{DispersionTerm, TermGradient, TermInput, TermOutput, chain_c6};
use crate::damping::Damping;
use crate::error::DispersionError;
use crate::math::constants::DISTANCE_EPSILON;
use crate::math::{axpy, distance};
use faer::Mat;

/// `49/40`, relating `C10` to `C8^2 / C6`.
const C10_FACTOR: f64 = 49.0 / 40.0;

/// The charge-dependent two-body term.
///
/// `E_ij = -C6_ij (s6 t6 + s8 qq t8 + s10 49/40 qq^2 t10)` with `qq = 3 r4r2_i r4r2_j`,
/// split evenly between both atoms of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TwoBody {
    pub damping: Damping,
}

impl TwoBody {
    pub fn new(damping: Damping) -> Self {
        Self { damping }
    }
}

impl DispersionTerm for TwoBody {
    fn name(&self) -> &str {
        "two-body"
    }

    fn charge_dependent(&self) -> bool {
        true
    }

    fn calculate(&self, input: &TermInput<'_>) -> Result<TermOutput, DispersionError> {
        let charges = input.charges.ok_or(DispersionError::MissingCharges)?;
        let species = input.species;
        let positions = input.positions;
        let params = input.params;
        let n_atoms = species.len();

        let weights = input.model.weight_references_with_gradients(
            species,
            input.cn,
            Some(charges),
            input.with_gradient,
            input.with_gradient,
        )?;
        let c6 = input.model.atomic_c6(species, &weights.weights)?;

        let mut energies = vec![0.0; n_atoms];
        let mut gradient = vec![[0.0; 3]; n_atoms];
        let mut de_dc6 = Mat::zeros(n_atoms, n_atoms);

        for i in 0..n_atoms {
            for j in 0..i {
                let (r, rij) = distance(positions[i], positions[j]);
                if r > input.cutoff.disp2 {
                    continue;
                }
                let r = r.max(DISTANCE_EPSILON);
                let qq = 3.0 * input.r4r2[i] * input.r4r2[j];
                let rvdw = input.rvdw[(i, j)];

                let (t6, dt6) = self.damping.pair(params, 6, r, qq, rvdw);
                let (t8, dt8) = self.damping.pair(params, 8, r, qq, rvdw);
                let mut radial = params.s6 * t6 + params.s8 * qq * t8;
                let mut dradial = params.s6 * dt6 + params.s8 * qq * dt8;
                if params.s10 != 0.0 {
                    let (t10, dt10) = self.damping.pair(params, 10, r, qq, rvdw);
                    radial += params.s10 * C10_FACTOR * qq * qq * t10;
                    dradial += params.s10 * C10_FACTOR * qq * qq * dt10;
                }

                let pair_energy = -c6[(i, j)] * radial;
                energies[i] += 0.5 * pair_energy;
                energies[j] += 0.5 * pair_energy;

                if input.with_gradient {
                    de_dc6[(i, j)] = -0.5 * radial;
                    de_dc6[(j, i)] = -0.5 * radial;
                    let scale = -c6[(i, j)] * dradial / r;
                    axpy(&mut gradient[i], scale, rij);
                    axpy(&mut gradient[j], -scale, rij);
                }
            }
        }

        let gradient = if input.with_gradient {
            let cn = match weights.dcn.as_ref() {
                Some(dcn) => chain_c6(input.model, species, &weights.weights, dcn, &de_dc6)?,
                None => vec![0.0; n_atoms],
            };
            let charges = match weights.dq.as_ref() {
                Some(dq) => chain_c6(input.model, species, &weights.weights, dq, &de_dc6)?,
                None => vec![0.0; n_atoms],
            };
            Some(TermGradient {
                positions: gradient,
                cn,
                charges,
            })
        } else {
            None
        };

        Ok(TermOutput { energies, gradient })
    }
}
