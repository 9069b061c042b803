use super::cli::Cli;
use super::error::CliError;
use super::io;
use dftd4::{
    AtomicSystem, CalculationOptions, Dispersion, ParameterStore, ReferenceData,
    get_default_parameters, get_default_reference,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

pub fn run(args: Cli) -> Result<(), CliError> {
    let custom_reference = match &args.calculation.reference {
        Some(path) => Some(ReferenceData::load_from_file(path)?),
        None => None,
    };
    let reference = custom_reference
        .as_ref()
        .unwrap_or_else(|| get_default_reference());
    let reference_label = match (&args.calculation.reference, &reference.description) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(description)) => description.clone(),
        (None, None) => "built-in".to_string(),
    };
    if args.calculation.reference.is_none() {
        info!("Using the built-in approximate reference table; energies differ from published D4 values.");
    }

    let custom_store = match &args.calculation.params {
        Some(path) => Some(ParameterStore::load_from_file(path)?),
        None => None,
    };
    let store = custom_store
        .as_ref()
        .unwrap_or_else(|| get_default_parameters());
    let params = store.get(&args.calculation.functional)?;
    info!(
        "Using damping parameters of '{}': {:?}",
        args.calculation.functional, params
    );

    let mut dispersion = Dispersion::new(reference);
    if args.calculation.no_atm {
        dispersion.deregister("three-body");
    }

    let (atoms, comment) = io::read_atoms(&args.input)?;
    let system = AtomicSystem::from_atoms(&atoms, args.calculation.total_charge);

    let source_name = if args.input == "-" {
        "stdin".to_string()
    } else {
        args.input.clone()
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message("Calculating dispersion energy...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let options = CalculationOptions {
        with_gradient: args.calculation.gradient,
        ..Default::default()
    };
    let result = dispersion.calculate_with(&system, &params, &options);

    pb.finish_and_clear();
    let result = result?;

    let writer = io::get_writer(&args.output.output)?;
    io::write_results(
        writer,
        &atoms,
        &result,
        &io::Summary {
            source_name: &source_name,
            comment: &comment,
            functional: &args.calculation.functional,
            reference: &reference_label,
        },
        &args.output.format,
        args.output.precision,
    )?;

    Ok(())
}
