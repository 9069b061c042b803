//! Axilrod–Teller–Muto three-body dispersion.

use super::{DispersionTerm, TermGradient, TermInput, TermOutput, chain_c6};
use crate::damping::Damping;
use crate::error::DispersionError;
use crate::math::axpy;
use faer::Mat;

/// The charge-independent three-body term.
///
/// Coefficients come from the weights at zero charge,
/// `C9_ijk = -s9 sqrt(|C6_ij C6_ik C6_jk|)`. Each atom of a triple receives a third of
/// the triple energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreeBody {
    pub damping: Damping,
}

impl ThreeBody {
    pub fn new(damping: Damping) -> Self {
        Self { damping }
    }
}

#[inline]
fn squared_distance(a: [f64; 3], b: [f64; 3]) -> (f64, [f64; 3]) {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2], d)
}

impl DispersionTerm for ThreeBody {
    fn name(&self) -> &str {
        "three-body"
    }

    fn charge_dependent(&self) -> bool {
        false
    }

    fn calculate(&self, input: &TermInput<'_>) -> Result<TermOutput, DispersionError> {
        let species = input.species;
        let positions = input.positions;
        let params = input.params;
        let n_atoms = species.len();

        let weights = input.model.weight_references_with_gradients(
            species,
            input.cn,
            None,
            input.with_gradient,
            false,
        )?;
        let c6 = input.model.atomic_c6(species, &weights.weights)?;

        let r0 = Mat::from_fn(n_atoms, n_atoms, |i, j| {
            let qq = 3.0 * input.r4r2[i] * input.r4r2[j];
            self.damping.three_body_radius(params, qq, input.rvdw[(i, j)])
        });

        let cutoff2 = input.cutoff.disp3 * input.cutoff.disp3;
        let exponent = params.alp / 3.0;

        let mut energies = vec![0.0; n_atoms];
        let mut gradient = vec![[0.0; 3]; n_atoms];
        let mut de_dc6 = Mat::zeros(n_atoms, n_atoms);

        for i in 0..n_atoms {
            for j in 0..i {
                let (r2ij, vij) = squared_distance(positions[i], positions[j]);
                if r2ij > cutoff2 || r2ij < f64::EPSILON {
                    continue;
                }
                for k in 0..j {
                    let (r2ik, vik) = squared_distance(positions[i], positions[k]);
                    let (r2jk, vjk) = squared_distance(positions[j], positions[k]);
                    if r2ik > cutoff2 || r2jk > cutoff2 {
                        continue;
                    }
                    if r2ik < f64::EPSILON || r2jk < f64::EPSILON {
                        continue;
                    }

                    let (c6ij, c6ik, c6jk) = (c6[(i, j)], c6[(i, k)], c6[(j, k)]);
                    let c9 = -params.s9 * (c6ij * c6ik * c6jk).abs().sqrt();
                    let r0ijk = r0[(i, j)] * r0[(i, k)] * r0[(j, k)];

                    let r2 = r2ij * r2ik * r2jk;
                    let r1 = r2.sqrt();
                    let r3 = r2 * r1;
                    let r5 = r3 * r2;

                    let t = 6.0 * (r0ijk / r1).powf(exponent);
                    let fdmp = 1.0 / (1.0 + t);

                    let (a, b, c) = (r2ij, r2jk, r2ik);
                    let x = a + b - c;
                    let y = a - b + c;
                    let z = -a + b + c;
                    let p = x * y * z;
                    let ang = 0.375 * p / r5 + 1.0 / r3;

                    let rr = ang * fdmp;
                    let triple = -c9 * rr;
                    energies[i] += triple / 3.0;
                    energies[j] += triple / 3.0;
                    energies[k] += triple / 3.0;

                    if !input.with_gradient {
                        continue;
                    }

                    // d/d(r^2) of the angular factor and the damping, per side.
                    let dang = |dp: f64, side: f64| {
                        0.375 * (dp / r5 - 2.5 * p / (r5 * side)) - 1.5 / (r3 * side)
                    };
                    let dfdmp = |side: f64| fdmp * fdmp * t * params.alp / (6.0 * side);

                    let de_da = -c9 * (dang(y * z + x * z - x * y, a) * fdmp + ang * dfdmp(a));
                    let de_db = -c9 * (dang(y * z - x * z + x * y, b) * fdmp + ang * dfdmp(b));
                    let de_dc = -c9 * (dang(-y * z + x * z + x * y, c) * fdmp + ang * dfdmp(c));

                    axpy(&mut gradient[i], 2.0 * de_da, vij);
                    axpy(&mut gradient[j], -2.0 * de_da, vij);
                    axpy(&mut gradient[j], 2.0 * de_db, vjk);
                    axpy(&mut gradient[k], -2.0 * de_db, vjk);
                    axpy(&mut gradient[i], 2.0 * de_dc, vik);
                    axpy(&mut gradient[k], -2.0 * de_dc, vik);

                    let half = -rr * c9 / 2.0;
                    if c6ij != 0.0 {
                        de_dc6[(i, j)] += half / c6ij;
                    }
                    if c6ik != 0.0 {
                        de_dc6[(i, k)] += half / c6ik;
                    }
                    if c6jk != 0.0 {
                        de_dc6[(j, k)] += half / c6jk;
                    }
                }
            }
        }

        let gradient = if input.with_gradient {
            let cn = match weights.dcn.as_ref() {
                Some(dcn) => chain_c6(input.model, species, &weights.weights, dcn, &de_dc6)?,
                None => vec![0.0; n_atoms],
            };
            Some(TermGradient {
                positions: gradient,
                cn,
                charges: vec![0.0; n_atoms],
            })
        } else {
            None
        };

        Ok(TermOutput { energies, gradient })
    }
}
