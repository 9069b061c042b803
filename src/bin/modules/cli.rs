use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

const ABOUT: &str = "A command-line tool for calculating atom-resolved D4 London dispersion corrections.

The built-in reference table uses approximate single-oscillator polarizabilities, so energies
follow the D4 model but do not reproduce published D4 values. Pass the exact tables with
--reference for reference-quality results.";
const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser)]
#[command(version, about = ABOUT, help_template = HELP_TEMPLATE)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input file containing molecular structure in XYZ format.
    ///
    /// Use '-' to read from standard input. The XYZ format should contain the number of atoms
    /// on the first line, a comment on the second line, followed by lines with element symbol
    /// (or atomic number) and x, y, z coordinates in angstrom.
    #[arg(value_name = "INPUT")]
    pub input: String,

    #[command(flatten)]
    pub output: OutputOptions,

    #[command(flatten)]
    pub calculation: CalculationOptions,
}

/// Options for controlling the output format and destination.
#[derive(Args)]
#[command(next_help_heading = "Output Options")]
pub struct OutputOptions {
    /// Output file path.
    ///
    /// If not specified, results are written to standard output.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for the results.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Number of decimal places to display for floating-point values.
    #[arg(short, long, default_value_t = 8)]
    pub precision: usize,
}

/// Options for controlling the calculation parameters.
#[derive(Args)]
#[command(next_help_heading = "Calculation Options")]
pub struct CalculationOptions {
    /// Density functional whose damping parameters are used.
    #[arg(long = "func", short = 'F', default_value = "pbe")]
    pub functional: String,

    /// Custom damping parameters file in TOML format.
    ///
    /// If not specified, built-in parameters are used.
    #[arg(short = 'P', long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Custom element reference data file in TOML format.
    ///
    /// If not specified, the built-in approximate table is used. Its polarizabilities are
    /// single-oscillator curves, not the published D4 data.
    #[arg(short = 'R', long, value_name = "FILE")]
    pub reference: Option<PathBuf>,

    /// Total charge of the molecular system.
    #[arg(short = 'q', long, default_value_t = 0.0)]
    pub total_charge: f64,

    /// Disable the three-body (ATM) term.
    #[arg(long)]
    pub no_atm: bool,

    /// Also compute the nuclear gradient.
    #[arg(short, long)]
    pub gradient: bool,
}

/// Output format for the calculation results.
#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table with atom indices, elements, and energies.
    Pretty,
    /// Comma-separated values with columns: index, element, energy and optional gradient.
    Csv,
    /// JSON object containing atoms array and metadata.
    Json,
}
