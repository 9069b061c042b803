//! This module provides the per-element reference data of the D4 model and utilities for
//! loading it from TOML files.
//!
//! Every element carries its covalent radius, the `r4r2` expectation value, the Pauling
//! electronegativity, the chemical hardness and effective nuclear charge used for charge
//! scaling, a van-der-Waals radius, the EEQ charge-model parameters, and a list of
//! reference states. Elements may be keyed by atomic number or symbol in the TOML file.

use crate::elements;
use crate::error::DispersionError;
use crate::math::constants::{BOHR_TO_ANGSTROM, COV_D3_SCALE, NFREQ};
use faer::Mat;
use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Largest rounded reference CN that gets its own multiplicity bin.
const MAX_CN_BIN: usize = 19;

/// Parameters of the electronegativity equilibration charge model.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EeqParameters {
    /// Electronegativity.
    pub chi: f64,
    /// Chemical hardness.
    pub eta: f64,
    /// Coordination-number dependence of the electronegativity.
    pub kcn: f64,
    /// Width of the Gaussian charge distribution (Bohr).
    pub rad: f64,
}

/// One tabulated reference state of an element.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ReferenceState {
    /// Reference coordination number.
    pub cn: f64,
    /// Reference partial charge from the EEQ model.
    pub q_eeq: f64,
    /// Reference partial charge from GFN2-xTB.
    pub q_gfn2: f64,
    /// Dynamic polarizability on the imaginary-frequency grid.
    pub alpha: Vec<f64>,
}

/// Reference data for a single element.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Pyykkö single-bond covalent radius in angstrom.
    #[serde(rename = "rcov")]
    pub covalent_radius: f64,
    /// Expectation value used to scale the higher dispersion orders.
    pub r4r2: f64,
    /// Pauling electronegativity.
    #[serde(rename = "en")]
    pub electronegativity: f64,
    /// Chemical hardness entering the charge scaling.
    #[serde(rename = "gam")]
    pub hardness: f64,
    /// Effective nuclear charge.
    pub zeff: f64,
    /// Van-der-Waals radius in angstrom.
    #[serde(rename = "rvdw")]
    pub vdw_radius: f64,
    /// EEQ charge model parameters.
    pub eeq: EeqParameters,
    /// Reference states, at least one.
    pub refs: Vec<ReferenceState>,
}

impl ElementData {
    /// D3 covalent radius in Bohr, as used by the coordination number.
    pub fn covalent_radius_d3(&self) -> f64 {
        COV_D3_SCALE * self.covalent_radius / BOHR_TO_ANGSTROM
    }

    /// Van-der-Waals radius in Bohr.
    pub fn vdw_radius_bohr(&self) -> f64 {
        self.vdw_radius / BOHR_TO_ANGSTROM
    }

    /// Number of Gaussian functions each reference state contributes to the weighting.
    ///
    /// References are binned by their rounded CN, the zero bin starting at one; a state
    /// in a bin holding `c` references gets `c (c + 1) / 2` Gaussians.
    pub fn gaussian_multiplicities(&self) -> Vec<usize> {
        let bin = |cn: f64| (cn.round().max(0.0) as usize).min(MAX_CN_BIN);

        let mut counts = [0usize; MAX_CN_BIN + 1];
        counts[0] = 1;
        for reference in &self.refs {
            counts[bin(reference.cn)] += 1;
        }

        self.refs
            .iter()
            .map(|reference| {
                let c = counts[bin(reference.cn)];
                c * (c + 1) / 2
            })
            .collect()
    }

    fn validate(&self, atomic_number: u8) -> Result<(), DispersionError> {
        if self.refs.is_empty() {
            return Err(DispersionError::InvalidReference {
                element: atomic_number,
                detail: "at least one reference state is required".to_string(),
            });
        }
        for (idx, reference) in self.refs.iter().enumerate() {
            if reference.alpha.len() != NFREQ {
                return Err(DispersionError::InvalidReference {
                    element: atomic_number,
                    detail: format!(
                        "reference {} has {} polarizability points, expected {}",
                        idx,
                        reference.alpha.len(),
                        NFREQ
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A collection of reference data for multiple elements, indexed by atomic number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReferenceData {
    /// Free-text provenance of the table, if the file declares one.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_element_map")]
    pub elements: HashMap<u8, ElementData>,
}

impl ReferenceData {
    /// Loads reference data from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DispersionError::IoError` if the file cannot be read, and the errors of
    /// [`ReferenceData::load_from_str`] otherwise.
    pub fn load_from_file(path: &Path) -> Result<Self, DispersionError> {
        let content = std::fs::read_to_string(path).map_err(|io_error| DispersionError::IoError {
            path: path.to_path_buf(),
            source: io_error,
        })?;

        Self::load_from_str(&content)
    }

    /// Parses reference data from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `DispersionError::DeserializationError` for invalid TOML or unknown element
    /// keys, and `DispersionError::InvalidReference` if an element has no reference
    /// states or a polarizability curve of the wrong length.
    ///
    /// # Examples
    ///
    /// ```
    /// use dftd4::ReferenceData;
    ///
    /// let alpha = vec![1.0; 23];
    /// let toml_data = format!(
    ///     r#"
    /// [elements.H]
    /// rcov = 0.32
    /// r4r2 = 2.00734898
    /// en = 2.20
    /// gam = 0.47259288
    /// zeff = 1.0
    /// rvdw = 1.20
    /// eeq = {{ chi = 1.23695041, eta = -0.35015861, kcn = 0.0491611, rad = 0.55159092 }}
    ///
    /// [[elements.H.refs]]
    /// cn = 0.0
    /// q_eeq = 0.0
    /// q_gfn2 = 0.0
    /// alpha = {:?}
    /// "#,
    ///     alpha
    /// );
    ///
    /// let data = ReferenceData::load_from_str(&toml_data).unwrap();
    /// assert_eq!(data.elements.len(), 1);
    /// ```
    pub fn load_from_str(toml_str: &str) -> Result<Self, DispersionError> {
        let data: Self = toml::from_str(toml_str)?;
        for (&atomic_number, element) in &data.elements {
            element.validate(atomic_number)?;
        }
        Ok(data)
    }

    /// Creates an empty collection.
    pub fn new() -> Self {
        ReferenceData {
            description: None,
            elements: HashMap::new(),
        }
    }

    /// Looks up the data of a single element.
    pub fn element(&self, atomic_number: u8) -> Result<&ElementData, DispersionError> {
        self.elements
            .get(&atomic_number)
            .ok_or(DispersionError::ParameterNotFound(atomic_number))
    }

    /// D3 covalent radii (Bohr) for every atom.
    pub fn covalent_radii(&self, species: &[u8]) -> Result<Vec<f64>, DispersionError> {
        species
            .iter()
            .map(|&z| self.element(z).map(ElementData::covalent_radius_d3))
            .collect()
    }

    /// `r4r2` expectation values for every atom.
    pub fn r4r2(&self, species: &[u8]) -> Result<Vec<f64>, DispersionError> {
        species
            .iter()
            .map(|&z| self.element(z).map(|e| e.r4r2))
            .collect()
    }

    /// Pauling electronegativities for every atom.
    pub fn electronegativities(&self, species: &[u8]) -> Result<Vec<f64>, DispersionError> {
        species
            .iter()
            .map(|&z| self.element(z).map(|e| e.electronegativity))
            .collect()
    }

    /// Pairwise van-der-Waals radii (Bohr) as the sum of the atomic radii.
    ///
    /// This is an approximation to a tabulated per-pair radius and only matters for zero
    /// damping. Pass exact radii through `CalculationOptions::rvdw` when they are needed.
    pub fn pairwise_vdw_radii(&self, species: &[u8]) -> Result<Mat<f64>, DispersionError> {
        let radii: Vec<f64> = species
            .iter()
            .map(|&z| self.element(z).map(ElementData::vdw_radius_bohr))
            .collect::<Result<_, _>>()?;
        let n = radii.len();
        Ok(Mat::from_fn(n, n, |i, j| radii[i] + radii[j]))
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserializes the element map, accepting atomic numbers or element symbols as keys.
fn deserialize_element_map<'de, D>(deserializer: D) -> Result<HashMap<u8, ElementData>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ElementMapVisitor;

    impl<'de> Visitor<'de> for ElementMapVisitor {
        type Value = HashMap<u8, ElementData>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map from atomic number or symbol to element data")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut elements = HashMap::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, ElementData>()? {
                let atomic_number = key.parse::<u8>().or_else(|_| {
                    elements::symbol_to_atomic_number(&key)
                        .ok_or_else(|| de::Error::custom(format!("invalid element key: '{}'", key)))
                })?;
                elements.insert(atomic_number, value);
            }
            Ok(elements)
        }
    }

    deserializer.deserialize_map(ElementMapVisitor)
}
