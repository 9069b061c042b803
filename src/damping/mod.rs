//! Short-range damping of the dispersion energy.
//!
//! Both families return the damped inverse power `t_n(r)` that multiplies `C_n`, together
//! with its radial derivative so that the terms can assemble analytic gradients.

mod parameters;

pub use parameters::{DampingParameters, FunctionalEntry, ParameterStore};

/// Damping function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Damping {
    /// Becke–Johnson rational damping, `1 / (r^n + R0^n)`.
    #[default]
    Rational,
    /// Chai–Head-Gordon zero damping, `f(r) / r^n` with a Fermi-like switch.
    ///
    /// The switch is centred on the pair van-der-Waals radius. Unless the caller supplies
    /// one through [`CalculationOptions::rvdw`](crate::CalculationOptions::rvdw), that radius
    /// is the sum of the two atomic radii of the reference data
    /// ([`ReferenceData::pairwise_vdw_radii`](crate::ReferenceData::pairwise_vdw_radii)),
    /// not a tabulated per-pair radius, so energies differ from programs using such a table.
    Zero,
}

impl Damping {
    /// Damped inverse power `t_n(r)` and `dt_n/dr` for dispersion order `n` (6, 8 or 10).
    ///
    /// `qq` is `3 r4r2_i r4r2_j`, `rvdw` the pair van-der-Waals radius in Bohr.
    pub fn pair(&self, params: &DampingParameters, order: i32, r: f64, qq: f64, rvdw: f64) -> (f64, f64) {
        match self {
            Damping::Rational => {
                let r0 = params.a1 * qq.sqrt() + params.a2;
                let t = 1.0 / (r.powi(order) + r0.powi(order));
                (t, -(order as f64) * r.powi(order - 1) * t * t)
            }
            Damping::Zero => {
                let rs = if order == 6 { params.rs6 } else { params.rs8 };
                let alpha = params.alp + (order - 6) as f64;
                // f = p / (p + 6) with p = x^alpha, finite for both p -> 0 and p -> inf.
                let p = (r / (rs * rvdw)).powf(alpha);
                let (f, df) = if p.is_finite() {
                    let f = p / (p + 6.0);
                    (f, 6.0 * alpha * f / ((p + 6.0) * r))
                } else {
                    (1.0, 0.0)
                };
                let rn = r.powi(order);
                (f / rn, df / rn - order as f64 * f / (rn * r))
            }
        }
    }

    /// Critical radius of one pair entering the three-body damping.
    pub fn three_body_radius(&self, params: &DampingParameters, qq: f64, rvdw: f64) -> f64 {
        match self {
            Damping::Rational => params.a1 * qq.sqrt() + params.a2,
            Damping::Zero => params.rs9 * rvdw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_derivative(damping: Damping, order: i32) {
        let params = DampingParameters::default();
        let (qq, rvdw) = (3.0 * 2.0 * 3.1, 5.5);
        for &r in &[2.5, 4.0, 6.5, 11.0] {
            let h = 1e-5;
            let (tp, _) = damping.pair(&params, order, r + h, qq, rvdw);
            let (tm, _) = damping.pair(&params, order, r - h, qq, rvdw);
            let (_, dt) = damping.pair(&params, order, r, qq, rvdw);
            assert_relative_eq!(dt, (tp - tm) / (2.0 * h), max_relative = 1e-5, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_rational_derivatives() {
        for order in [6, 8, 10] {
            check_derivative(Damping::Rational, order);
        }
    }

    #[test]
    fn test_zero_derivatives() {
        for order in [6, 8, 10] {
            check_derivative(Damping::Zero, order);
        }
    }

    #[test]
    fn test_rational_is_finite_at_contact() {
        let params = DampingParameters::default();
        let (t, dt) = Damping::Rational.pair(&params, 6, 0.0, 18.0, 5.0);
        let r0 = params.a1 * 18.0f64.sqrt() + params.a2;
        assert_relative_eq!(t, 1.0 / r0.powi(6), epsilon = 1e-15);
        assert_eq!(dt, 0.0);
    }

    #[test]
    fn test_zero_damping_is_finite_for_coincident_atoms() {
        let params = DampingParameters {
            alp: 16.0,
            ..DampingParameters::default()
        };
        let r = crate::math::constants::DISTANCE_EPSILON;
        for order in [6, 8, 10] {
            let (t, dt) = Damping::Zero.pair(&params, order, r, 18.0, 5.0);
            assert_eq!(t, 0.0);
            assert_eq!(dt, 0.0);
        }
    }

    #[test]
    fn test_zero_damping_saturates_without_overflow() {
        let params = DampingParameters {
            alp: 16.0,
            ..DampingParameters::default()
        };
        let r = 1.0e30;
        let (t, dt) = Damping::Zero.pair(&params, 10, r, 18.0, 1.0e-3);
        assert!(t.is_finite() && dt.is_finite());
        assert_relative_eq!(t * r.powi(10), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_damping_approaches_bare_power_at_long_range() {
        let params = DampingParameters::default();
        let r = 60.0;
        for damping in [Damping::Rational, Damping::Zero] {
            let (t, _) = damping.pair(&params, 6, r, 18.0, 5.0);
            assert_relative_eq!(t * r.powi(6), 1.0, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_three_body_radius() {
        let params = DampingParameters::default();
        assert_relative_eq!(
            Damping::Rational.three_body_radius(&params, 16.0, 5.0),
            0.4 * 4.0 + 5.0
        );
        assert_relative_eq!(Damping::Zero.three_body_radius(&params, 16.0, 6.0), 8.0);
    }
}
