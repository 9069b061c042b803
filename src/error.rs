use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all fallible operations in the `dftd4` library.
///
/// Numerical degeneracies inside the reference weighting are never reported through
/// this type; they are resolved by masking. Everything here is a problem with the
/// inputs or the configuration and terminates the calculation immediately.
#[derive(Error, Debug)]
pub enum DispersionError {
    /// Two per-atom quantities disagree in length.
    ///
    /// `quantity` names the offending input (e.g. `"positions"`), `expected` is the
    /// number of atoms implied by the species list.
    #[error("Shape of {quantity} ({found}) is not consistent with atomic numbers ({expected})")]
    ShapeMismatch {
        /// Name of the inconsistent input.
        quantity: &'static str,
        /// Length implied by the species.
        expected: usize,
        /// Length actually supplied.
        found: usize,
    },

    /// A validation error indicating that the system contains no atoms.
    #[error("Input validation failed: at least one atom is required for a calculation")]
    NoAtoms,

    /// The reference data does not contain the element with the given atomic number.
    #[error("Reference parameters not found for element with atomic number: {0}")]
    ParameterNotFound(u8),

    /// A pre-built model instance was asked about a species it was not built for.
    #[error("Dispersion model was not constructed for element with atomic number: {0}")]
    SpeciesNotInModel(u8),

    /// The model identifier is not one of the supported dispersion models.
    #[error("Unknown dispersion model '{0}'. Please use 'd4'.")]
    UnknownModel(String),

    /// The reference charge source is not one of the supported models.
    #[error("Unknown reference charges '{0}'. Please use 'eeq' or 'gfn2'.")]
    UnknownReferenceCharges(String),

    /// No damping parameters are stored for the requested method.
    #[error("No damping parameters found for functional '{0}'")]
    UnknownFunctional(String),

    /// Atomic charges were passed explicitly although no registered term consumes them.
    #[error(
        "Atomic charges are explicitly provided, but no term requires them. Remove the charges or register a charge-dependent term."
    )]
    UnusedCharges,

    /// A charge-dependent term was evaluated without atomic charges.
    #[error("A charge-dependent dispersion term was evaluated without atomic charges")]
    MissingCharges,

    /// The reference table for an element is malformed.
    #[error("Invalid reference data for element {element}: {detail}")]
    InvalidReference {
        /// Atomic number of the offending element.
        element: u8,
        /// What is wrong with it.
        detail: String,
    },

    /// A failure within the charge solver's linear algebra.
    #[error("Failed to solve the linear matrix system: {0}")]
    LinalgError(String),

    /// An I/O error that occurred while attempting to read a parameter file.
    #[error("I/O error at path '{path}': {source}")]
    IoError {
        /// The path of the file that caused the I/O error.
        path: PathBuf,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML or a structural mismatch with the expected parameter format.
    #[error("Failed to deserialize TOML parameters: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

impl DispersionError {
    pub(crate) fn check_len(
        quantity: &'static str,
        expected: usize,
        found: usize,
    ) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                quantity,
                expected,
                found,
            })
        }
    }
}
