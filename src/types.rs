//! Core input and output types of the dispersion calculation.
//!
//! The `AtomView` trait decouples the library from any particular molecular data structure;
//! `AtomicSystem` is the owned form the orchestrator works on, and `DispersionResult`
//! carries the atom-resolved energy together with optional derivatives.

/// A trait for viewing atom data without owning it.
///
/// Implement this for your own atom type to build an [`AtomicSystem`] without writing
/// a conversion by hand.
pub trait AtomView {
    /// Returns the atomic number of the atom.
    fn atomic_number(&self) -> u8;

    /// Returns the Cartesian position of the atom in Bohr.
    fn position(&self) -> [f64; 3];
}

/// A concrete atom with atomic number and position (Bohr).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atom {
    /// The atomic number of the atom, identifying its chemical element.
    pub atomic_number: u8,
    /// The position of the atom in Bohr.
    pub position: [f64; 3],
}

impl AtomView for Atom {
    #[inline(always)]
    fn atomic_number(&self) -> u8 {
        self.atomic_number
    }

    #[inline(always)]
    fn position(&self) -> [f64; 3] {
        self.position
    }
}

/// A molecule: species, aligned positions and the total charge.
///
/// The fields are public for convenience. The orchestrator checks that `species` and
/// `positions` have the same length before doing any work.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicSystem {
    /// Atomic numbers, one per atom.
    pub species: Vec<u8>,
    /// Cartesian coordinates in Bohr, aligned with `species`.
    pub positions: Vec<[f64; 3]>,
    /// Total molecular charge, used when atomic charges have to be computed.
    pub charge: f64,
}

impl AtomicSystem {
    pub fn new(species: Vec<u8>, positions: Vec<[f64; 3]>, charge: f64) -> Self {
        Self {
            species,
            positions,
            charge,
        }
    }

    /// Collects any slice of [`AtomView`] implementors into an owned system.
    pub fn from_atoms<A: AtomView>(atoms: &[A], charge: f64) -> Self {
        Self {
            species: atoms.iter().map(AtomView::atomic_number).collect(),
            positions: atoms.iter().map(AtomView::position).collect(),
            charge,
        }
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

/// The result of a dispersion calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionResult {
    /// Atom-resolved dispersion energy in Hartree, same order as the input atoms.
    pub energies: Vec<f64>,
    /// Nuclear gradient `dE/dr` in Hartree/Bohr, present when requested.
    ///
    /// If the charges were computed internally, the charge response is already included.
    pub gradient: Option<Vec<[f64; 3]>>,
    /// Derivative of the energy with respect to the atomic charges.
    ///
    /// Only present when a gradient was requested and the caller supplied the charges;
    /// chaining it with `dq/dr` of the caller's charge model completes the gradient.
    pub charge_derivative: Option<Vec<f64>>,
}

impl DispersionResult {
    /// Total dispersion energy, i.e. the sum over the atom-resolved contributions.
    pub fn energy(&self) -> f64 {
        self.energies.iter().sum()
    }
}
