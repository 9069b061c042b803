//! This module defines configuration options for the EEQ charge model.
//!
//! The options only concern the coordination number that shifts the electronegativities;
//! the interaction kernel itself has no tunable parameters beyond the per-element data.

use crate::math::constants::{CN_EEQ_MAX, CUTOFF_CN_EEQ, KCN_ERF};

/// Configuration of the EEQ coordination number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EeqOptions {
    /// Real-space cutoff of the coordination number in Bohr.
    pub cutoff: f64,
    /// Saturation limit of the coordination number.
    ///
    /// Large coordination numbers are smoothly capped near this value so that densely
    /// packed atoms do not shift their electronegativity without bound.
    pub cn_max: f64,
    /// Steepness of the error-function counting.
    pub kcn: f64,
}

impl Default for EeqOptions {
    fn default() -> Self {
        Self {
            cutoff: CUTOFF_CN_EEQ,
            cn_max: CN_EEQ_MAX,
            kcn: KCN_ERF,
        }
    }
}
