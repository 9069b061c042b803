//! Damping parameters and the functional parameter store.
//!
//! A store is a TOML document with a `[default]` table and one `[functionals.<name>]`
//! table per method. Functional entries inherit every coefficient they do not set.

use crate::error::DispersionError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Empirical coefficients of one method, consumed read-only by the dispersion terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampingParameters {
    /// Scaling of the dipole-dipole (C6) term.
    pub s6: f64,
    /// Scaling of the dipole-quadrupole (C8) term.
    pub s8: f64,
    /// Scaling of the three-body term.
    pub s9: f64,
    /// Scaling of the C10 term, disabled when zero.
    pub s10: f64,
    /// Rational damping: linear scaling of the critical radius.
    pub a1: f64,
    /// Rational damping: offset of the critical radius (Bohr).
    pub a2: f64,
    /// Exponent of the zero-damping function.
    pub alp: f64,
    /// Zero damping: radius scaling for the C6 term.
    pub rs6: f64,
    /// Zero damping: radius scaling for the C8 and C10 terms.
    pub rs8: f64,
    /// Zero damping: radius scaling for the three-body term.
    pub rs9: f64,
}

impl Default for DampingParameters {
    fn default() -> Self {
        Self {
            s6: 1.0,
            s8: 1.0,
            s9: 1.0,
            s10: 0.0,
            a1: 0.4,
            a2: 5.0,
            alp: 16.0,
            rs6: 1.0,
            rs8: 1.0,
            rs9: 4.0 / 3.0,
        }
    }
}

/// Coefficients as written in the TOML store; unset fields fall back to the defaults.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
struct PartialParameters {
    s6: Option<f64>,
    s8: Option<f64>,
    s9: Option<f64>,
    s10: Option<f64>,
    a1: Option<f64>,
    a2: Option<f64>,
    alp: Option<f64>,
    rs6: Option<f64>,
    rs8: Option<f64>,
    rs9: Option<f64>,
    doi: Option<String>,
}

impl PartialParameters {
    fn resolve(&self, base: &DampingParameters) -> DampingParameters {
        DampingParameters {
            s6: self.s6.unwrap_or(base.s6),
            s8: self.s8.unwrap_or(base.s8),
            s9: self.s9.unwrap_or(base.s9),
            s10: self.s10.unwrap_or(base.s10),
            a1: self.a1.unwrap_or(base.a1),
            a2: self.a2.unwrap_or(base.a2),
            alp: self.alp.unwrap_or(base.alp),
            rs6: self.rs6.unwrap_or(base.rs6),
            rs8: self.rs8.unwrap_or(base.rs8),
            rs9: self.rs9.unwrap_or(base.rs9),
        }
    }
}

#[derive(Deserialize, Debug)]
struct StoreFile {
    #[serde(default)]
    default: PartialParameters,
    #[serde(default)]
    functionals: HashMap<String, PartialParameters>,
}

/// A stored functional: its damping parameters and the literature reference, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalEntry {
    pub parameters: DampingParameters,
    pub doi: Option<String>,
}

/// Damping parameters for a set of methods, keyed by lower-case method name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterStore {
    default: DampingParameters,
    functionals: HashMap<String, FunctionalEntry>,
}

impl ParameterStore {
    /// Loads a parameter store from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, DispersionError> {
        let content = std::fs::read_to_string(path).map_err(|io_error| DispersionError::IoError {
            path: path.to_path_buf(),
            source: io_error,
        })?;

        Self::load_from_str(&content)
    }

    /// Parses a parameter store from a TOML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use dftd4::ParameterStore;
    ///
    /// let store = ParameterStore::load_from_str(
    ///     r#"
    /// [default]
    /// s9 = 1.0
    ///
    /// [functionals.pbe]
    /// s8 = 0.95948085
    /// a1 = 0.38574991
    /// a2 = 4.80688534
    /// "#,
    /// )
    /// .unwrap();
    ///
    /// let pbe = store.get("PBE").unwrap();
    /// assert_eq!(pbe.a1, 0.38574991);
    /// assert_eq!(pbe.s6, 1.0);
    /// ```
    pub fn load_from_str(toml_str: &str) -> Result<Self, DispersionError> {
        let file: StoreFile = toml::from_str(toml_str)?;
        let default = file.default.resolve(&DampingParameters::default());

        let functionals = file
            .functionals
            .into_iter()
            .map(|(name, partial)| {
                let entry = FunctionalEntry {
                    parameters: partial.resolve(&default),
                    doi: partial.doi.clone(),
                };
                (name.to_lowercase(), entry)
            })
            .collect();

        Ok(Self {
            default,
            functionals,
        })
    }

    /// The parameters of the `[default]` table.
    pub fn default_parameters(&self) -> DampingParameters {
        self.default
    }

    /// Damping parameters of a method (case-insensitive).
    pub fn get(&self, functional: &str) -> Result<DampingParameters, DispersionError> {
        self.get_with_reference(functional)
            .map(|entry| entry.parameters)
    }

    /// Damping parameters of a method together with its literature reference.
    pub fn get_with_reference(&self, functional: &str) -> Result<&FunctionalEntry, DispersionError> {
        self.functionals
            .get(&functional.to_lowercase())
            .ok_or_else(|| DispersionError::UnknownFunctional(functional.to_string()))
    }

    /// Names of all stored methods in alphabetical order.
    pub fn functionals(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functionals.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const STORE: &str = r#"
        [default]
        s6 = 1.0
        s9 = 1.0
        alp = 16.0

        [functionals.tpssh]
        s8 = 1.85897750
        a1 = 0.44286966
        a2 = 4.60230534
        doi = "10.1063/1.5090222"

        [functionals.custom]
        s6 = 0.5
        s9 = 0.0
    "#;

    #[test]
    fn test_functional_inherits_default() {
        let store = ParameterStore::load_from_str(STORE).unwrap();
        let tpssh = store.get("tpssh").unwrap();
        assert_eq!(tpssh.s6, 1.0);
        assert_eq!(tpssh.s8, 1.85897750);
        assert_eq!(tpssh.alp, 16.0);
        assert_eq!(tpssh.s10, 0.0);

        let custom = store.get("custom").unwrap();
        assert_eq!(custom.s6, 0.5);
        assert_eq!(custom.s9, 0.0);
        assert_eq!(custom.a1, 0.4);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let store = ParameterStore::load_from_str(STORE).unwrap();
        assert_eq!(store.get("TPSSh").unwrap(), store.get("tpssh").unwrap());
    }

    #[test]
    fn test_reference_is_reported() {
        let store = ParameterStore::load_from_str(STORE).unwrap();
        let entry = store.get_with_reference("tpssh").unwrap();
        assert_eq!(entry.doi.as_deref(), Some("10.1063/1.5090222"));
        assert!(store.get_with_reference("custom").unwrap().doi.is_none());
    }

    #[test]
    fn test_unknown_functional() {
        let store = ParameterStore::load_from_str(STORE).unwrap();
        assert!(matches!(
            store.get("wb97x"),
            Err(DispersionError::UnknownFunctional(name)) if name == "wb97x"
        ));
    }

    #[test]
    fn test_unknown_coefficient_is_rejected() {
        let result = ParameterStore::load_from_str("[functionals.pbe]\ns7 = 1.0\n");
        assert!(matches!(result, Err(DispersionError::DeserializationError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", STORE).unwrap();
        let store = ParameterStore::load_from_file(temp_file.path()).unwrap();
        assert_eq!(store.functionals(), vec!["custom", "tpssh"]);
    }
}
