//! Physical constants, numerical thresholds and model defaults.

/// Conversion factor from Bohr radii to angstroms.
pub const BOHR_TO_ANGSTROM: f64 = 0.529_177_210_903;

/// Conversion factor from Hartree to kcal/mol.
pub const HARTREE_TO_KCALMOL: f64 = 627.509_474_277_194;

/// Smallest distance (Bohr) that enters any kernel; shorter distances are clamped to it.
pub const DISTANCE_EPSILON: f64 = f64::EPSILON;

/// Placeholder normalisation for inactive reference states.
pub const TINY_NORM: f64 = 1.0e-300;

/// Number of points on the imaginary-frequency grid of the reference polarizabilities.
pub const NFREQ: usize = 23;

/// Imaginary frequencies (atomic units) on which reference polarizabilities are tabulated.
pub const FREQUENCIES: [f64; NFREQ] = [
    0.000001, 0.050000, 0.100000, 0.200000, 0.300000, 0.400000, 0.500000, 0.600000, 0.700000,
    0.800000, 0.900000, 1.000000, 1.200000, 1.400000, 1.600000, 1.800000, 2.000000, 2.500000,
    3.000000, 4.000000, 5.000000, 7.500000, 10.00000,
];

/// Steepness of the Gaussian reference weighting.
pub const WF_DEFAULT: f64 = 6.0;

/// Charge scaling height.
pub const GA_DEFAULT: f64 = 3.0;

/// Charge scaling steepness.
pub const GC_DEFAULT: f64 = 2.0;

/// Scaling of the D3 covalent radii relative to Pyykkö's single-bond radii.
pub const COV_D3_SCALE: f64 = 4.0 / 3.0;

/// Steepness of the error-function counting function.
pub const KCN_ERF: f64 = 7.5;

/// Steepness of the exponential counting function.
pub const KCN_EXP: f64 = 16.0;

/// Electronegativity pair factor of the D4 coordination number.
pub const CN_K4: f64 = 4.10451;
pub const CN_K5: f64 = 19.08857;
pub const CN_K6: f64 = 2.0 * 11.28174 * 11.28174;

/// Saturation limit of the EEQ coordination number.
pub const CN_EEQ_MAX: f64 = 8.0;

/// Real-space cutoffs in Bohr.
pub const CUTOFF_CN: f64 = 30.0;
pub const CUTOFF_CN_EEQ: f64 = 25.0;
pub const CUTOFF_DISP2: f64 = 50.0;
pub const CUTOFF_DISP3: f64 = 25.0;
