//! Pairwise counting functions for coordination numbers.

use crate::math::constants::{KCN_ERF, KCN_EXP};
use libm::erf;
use std::f64::consts::PI;

/// A smooth step that counts a neighbour at distance `r` against the summed radii `rc`.
pub trait CountingFunction: Send + Sync {
    /// Counting value, 1 well inside `rc` and 0 well outside.
    fn count(&self, r: f64, rc: f64) -> f64;

    /// Derivative of [`CountingFunction::count`] with respect to `r`.
    fn derivative(&self, r: f64, rc: f64) -> f64;
}

/// Error-function counting, `0.5 (1 + erf(-k (r/rc - 1)))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErfCount {
    pub kcn: f64,
}

impl Default for ErfCount {
    fn default() -> Self {
        Self { kcn: KCN_ERF }
    }
}

impl CountingFunction for ErfCount {
    #[inline]
    fn count(&self, r: f64, rc: f64) -> f64 {
        0.5 * (1.0 + erf(-self.kcn * (r / rc - 1.0)))
    }

    #[inline]
    fn derivative(&self, r: f64, rc: f64) -> f64 {
        let arg = self.kcn * (r / rc - 1.0);
        -self.kcn / (PI.sqrt() * rc) * (-arg * arg).exp()
    }
}

/// Fermi-like counting, `1 / (1 + exp(-k (rc/r - 1)))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpCount {
    pub kcn: f64,
}

impl Default for ExpCount {
    fn default() -> Self {
        Self { kcn: KCN_EXP }
    }
}

impl CountingFunction for ExpCount {
    #[inline]
    fn count(&self, r: f64, rc: f64) -> f64 {
        1.0 / (1.0 + (-self.kcn * (rc / r - 1.0)).exp())
    }

    #[inline]
    fn derivative(&self, r: f64, rc: f64) -> f64 {
        let expterm = (-self.kcn * (rc / r - 1.0)).exp();
        let f = 1.0 / (1.0 + expterm);
        -f * f * expterm * self.kcn * rc / (r * r)
    }
}

/// One of the built-in counting functions, chosen at run time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Counting {
    Erf(ErfCount),
    Exp(ExpCount),
}

impl Default for Counting {
    fn default() -> Self {
        Counting::Erf(ErfCount::default())
    }
}

impl From<ErfCount> for Counting {
    fn from(counting: ErfCount) -> Self {
        Counting::Erf(counting)
    }
}

impl From<ExpCount> for Counting {
    fn from(counting: ExpCount) -> Self {
        Counting::Exp(counting)
    }
}

impl CountingFunction for Counting {
    #[inline]
    fn count(&self, r: f64, rc: f64) -> f64 {
        match self {
            Counting::Erf(f) => f.count(r, rc),
            Counting::Exp(f) => f.count(r, rc),
        }
    }

    #[inline]
    fn derivative(&self, r: f64, rc: f64) -> f64 {
        match self {
            Counting::Erf(f) => f.derivative(r, rc),
            Counting::Exp(f) => f.derivative(r, rc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check<C: CountingFunction>(counting: C) {
        let rc = 2.9;
        for &r in &[1.0, 2.5, 2.9, 3.3, 5.0] {
            let h = 1e-6;
            let numerical = (counting.count(r + h, rc) - counting.count(r - h, rc)) / (2.0 * h);
            assert_relative_eq!(
                counting.derivative(r, rc),
                numerical,
                max_relative = 1e-6,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_erf_derivative() {
        check(ErfCount::default());
    }

    #[test]
    fn test_exp_derivative() {
        check(ExpCount::default());
    }

    #[test]
    fn test_runtime_choice_delegates() {
        let exp = ExpCount { kcn: 10.0 };
        let counting = Counting::from(exp);
        assert_eq!(counting.count(2.0, 2.6), exp.count(2.0, 2.6));
        assert_eq!(counting.derivative(2.0, 2.6), exp.derivative(2.0, 2.6));
        assert_eq!(Counting::default(), Counting::Erf(ErfCount::default()));
    }

    #[test]
    fn test_half_count_at_summed_radii() {
        assert_relative_eq!(ErfCount::default().count(3.0, 3.0), 0.5);
        assert_relative_eq!(ExpCount::default().count(3.0, 3.0), 0.5);
    }

    #[test]
    fn test_limits() {
        let erf_count = ErfCount::default();
        assert!(erf_count.count(0.5, 3.0) > 0.999_999);
        assert!(erf_count.count(9.0, 3.0) < 1e-12);
        let exp_count = ExpCount::default();
        assert!(exp_count.count(1.0, 3.0) > 0.999_999);
        assert!(exp_count.count(30.0, 3.0) < 1e-6);
    }
}
