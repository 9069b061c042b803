//! Atom-resolved D4 London dispersion corrections.
//!
//! The crate evaluates the dispersion energy of a molecule as a sum of registered terms,
//! by default a charge-dependent two-body term with orders 6 and 8 and the
//! Axilrod–Teller–Muto three-body term. Dispersion coefficients come from
//! Casimir–Polder integration of reference polarizabilities weighted by coordination
//! number and atomic partial charge. Missing charges are obtained from the
//! electronegativity equilibration (EEQ) model. All quantities use atomic units:
//! positions in Bohr and energies in Hartree.
//!
//! # Bundled data
//!
//! The reference table returned by [`get_default_reference`] covers H, Li, C, N, O, F, Si,
//! P, S and Cl with approximate polarizabilities: every reference state carries a
//! single-oscillator curve `a0 / (1 + (w / w0)^2)` instead of the published D4 data. The
//! functional form of the model is unchanged, but absolute energies do not match published
//! D4 values. Load the exact tables with [`ReferenceData::load_from_file`] and pass them to
//! [`Dispersion::new`] when reference-quality numbers are needed.
//!
//! # Examples
//!
//! ```
//! use dftd4::{get_default_parameters, get_default_reference, AtomicSystem, CalculationOptions, Dispersion};
//!
//! let dispersion = Dispersion::new(get_default_reference());
//! let params = get_default_parameters().get("pbe0").unwrap();
//!
//! let methane = AtomicSystem::new(
//!     vec![6, 1, 1, 1, 1],
//!     vec![
//!         [0.0, 0.0, 0.0],
//!         [1.1888, 1.1888, 1.1888],
//!         [-1.1888, -1.1888, 1.1888],
//!         [-1.1888, 1.1888, -1.1888],
//!         [1.1888, -1.1888, -1.1888],
//!     ],
//!     0.0,
//! );
//! let options = CalculationOptions {
//!     with_gradient: true,
//!     ..Default::default()
//! };
//!
//! let result = dispersion.calculate_with(&methane, &params, &options).unwrap();
//! assert!(result.energy() < 0.0);
//! assert_eq!(result.gradient.unwrap().len(), 5);
//! ```

pub mod charges;
pub mod damping;
pub mod dispersion;
pub mod elements;
pub mod error;
pub mod math;
pub mod model;
pub mod ncoord;
pub mod params;
pub mod types;

pub use charges::{ChargeResult, EeqModel, EeqOptions};
pub use damping::{Damping, DampingParameters, FunctionalEntry, ParameterStore};
pub use dispersion::{
    CalculationOptions, Cutoff, Dispersion, DispersionTerm, TermGradient, TermInput, TermOutput,
    ThreeBody, TwoBody,
};
pub use error::DispersionError;
pub use model::{
    D4Model, DispersionModel, ModelKind, ModelOptions, Precision, RefCharges, ReferenceWeights,
};
pub use ncoord::{CnFunction, Counting};
pub use params::{ElementData, ReferenceData};
pub use types::{Atom, AtomView, AtomicSystem, DispersionResult};

use std::sync::OnceLock;

static DEFAULT_REFERENCE: OnceLock<ReferenceData> = OnceLock::new();
static DEFAULT_PARAMETERS: OnceLock<ParameterStore> = OnceLock::new();

/// The bundled element reference data.
///
/// The polarizabilities are approximate single-oscillator curves, not the published D4
/// tables; see the crate documentation. [`ReferenceData::description`] says so as well.
pub fn get_default_reference() -> &'static ReferenceData {
    DEFAULT_REFERENCE.get_or_init(|| {
        const DEFAULT_REFERENCE_TOML: &str = include_str!("../resources/d4.reference.toml");
        ReferenceData::load_from_str(DEFAULT_REFERENCE_TOML)
            .expect("Failed to parse embedded reference data. This is a library bug.")
    })
}

/// The bundled rational damping parameters.
pub fn get_default_parameters() -> &'static ParameterStore {
    DEFAULT_PARAMETERS.get_or_init(|| {
        const DEFAULT_PARAMS_TOML: &str = include_str!("../resources/d4.parameters.toml");
        ParameterStore::load_from_str(DEFAULT_PARAMS_TOML)
            .expect("Failed to parse embedded damping parameters. This is a library bug.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_reference() {
        let reference1 = get_default_reference();
        assert!(
            reference1.elements.get(&6).is_some(),
            "Carbon (6) should be present"
        );
        assert!(
            reference1.elements.get(&8).is_some(),
            "Oxygen (8) should be present"
        );

        let reference2 = get_default_reference();
        assert_eq!(
            reference1 as *const _, reference2 as *const _,
            "Subsequent calls should return a cached reference"
        );
    }

    #[test]
    fn test_get_default_parameters() {
        let store = get_default_parameters();
        assert!(store.get("pbe").is_ok(), "PBE should be present");
        assert!(store.get("PBE0").is_ok(), "Lookup should ignore case");
        assert!(std::ptr::eq(store, get_default_parameters()));
    }
}
