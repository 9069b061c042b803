use super::cli::OutputFormat;
use super::error::CliError;
use dftd4::elements::{atomic_number_to_symbol, symbol_to_atomic_number_ignore_case};
use dftd4::math::constants::{BOHR_TO_ANGSTROM, HARTREE_TO_KCALMOL};
use dftd4::{Atom, DispersionResult};
use prettytable::*;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Context printed alongside the results.
pub struct Summary<'a> {
    pub source_name: &'a str,
    pub comment: &'a str,
    pub functional: &'a str,
    pub reference: &'a str,
}

/// Reads an XYZ file in angstrom and returns the atoms with positions in Bohr.
pub fn read_atoms(input_spec: &str) -> Result<(Vec<Atom>, String), CliError> {
    let reader: Box<dyn BufRead> = if input_spec == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = std::fs::File::open(input_spec).map_err(|e| CliError::Io {
            path: PathBuf::from(input_spec),
            source: e,
        })?;
        Box::new(BufReader::new(file))
    };

    let parse_error = |details: String| CliError::XyzParse {
        source_name: input_spec.to_string(),
        details,
    };

    let mut lines = reader.lines();

    let num_atoms_line = lines
        .next()
        .ok_or_else(|| parse_error("Missing number of atoms line".to_string()))??;
    let num_atoms: usize = num_atoms_line
        .trim()
        .parse()
        .map_err(|_| parse_error(format!("Invalid number of atoms: {}", num_atoms_line)))?;

    let comment = lines
        .next()
        .ok_or_else(|| parse_error("Missing comment line".to_string()))??;

    let mut atoms = Vec::with_capacity(num_atoms);
    for (i, line) in lines.enumerate() {
        if i >= num_atoms {
            break;
        }
        let line = line.map_err(|e| parse_error(format!("Error reading line {}: {}", i + 3, e)))?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(parse_error(format!(
                "Line {}: expected at least 4 fields, got {}",
                i + 3,
                parts.len()
            )));
        }
        let atomic_number = parse_element(parts[0])
            .ok_or_else(|| parse_error(format!("Unknown element: {}", parts[0])))?;

        let mut position = [0.0; 3];
        for (axis, (value, label)) in position.iter_mut().zip(["x", "y", "z"]).enumerate() {
            let field = parts[axis + 1];
            let angstrom: f64 = field
                .parse()
                .map_err(|_| parse_error(format!("Invalid {} coordinate: {}", label, field)))?;
            *value = angstrom / BOHR_TO_ANGSTROM;
        }
        atoms.push(Atom {
            atomic_number,
            position,
        });
    }

    if atoms.len() != num_atoms {
        return Err(parse_error(format!(
            "Expected {} atoms, got {}",
            num_atoms,
            atoms.len()
        )));
    }

    Ok((atoms, comment))
}

fn parse_element(s: &str) -> Option<u8> {
    if let Ok(num) = s.parse::<u8>() {
        return Some(num);
    }
    symbol_to_atomic_number_ignore_case(s)
}

pub fn get_writer(output_path: &Option<PathBuf>) -> Result<Box<dyn Write>, CliError> {
    match output_path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|e| CliError::Io {
                path: path.clone(),
                source: e,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

pub fn write_results(
    mut writer: Box<dyn Write>,
    atoms: &[Atom],
    result: &DispersionResult,
    summary: &Summary<'_>,
    format: &OutputFormat,
    precision: usize,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Pretty => write_pretty_table(&mut writer, atoms, result, summary, precision),
        OutputFormat::Csv => write_csv(&mut writer, atoms, result, precision),
        OutputFormat::Json => write_json(&mut writer, atoms, result, summary, precision),
    }
}

fn symbol(atom: &Atom) -> &'static str {
    atomic_number_to_symbol(atom.atomic_number).unwrap_or("??")
}

fn write_pretty_table(
    writer: &mut dyn Write,
    atoms: &[Atom],
    result: &DispersionResult,
    summary: &Summary<'_>,
    precision: usize,
) -> Result<(), CliError> {
    let box_format = format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Title],
            format::LineSeparator::new('═', '╪', '╞', '╡'),
        )
        .separators(
            &[format::LinePosition::Intern],
            format::LineSeparator::new('─', '┼', '├', '┤'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build();

    let no_intern_format = format::FormatBuilder::new()
        .column_separator('│')
        .borders('│')
        .separators(
            &[format::LinePosition::Top],
            format::LineSeparator::new('─', '┬', '╭', '╮'),
        )
        .separators(
            &[format::LinePosition::Bottom],
            format::LineSeparator::new('─', '┴', '╰', '╯'),
        )
        .padding(1, 1)
        .build();

    let energy = result.energy();

    let mut title_table = Table::new();
    title_table.set_format(box_format);
    title_table.add_row(row![bc->"DFT-D4 Dispersion Correction"]);
    title_table.print(writer)?;
    writeln!(writer)?;

    let mut summary_table = Table::new();
    summary_table.set_format(no_intern_format);
    summary_table.add_row(row![b->"Source File:", summary.source_name]);
    summary_table.add_row(row![b->"Comment:", summary.comment.trim()]);
    summary_table.add_row(row![b->"Functional:", summary.functional]);
    summary_table.add_row(row![b->"Reference Data:", summary.reference]);
    summary_table.add_row(row![b->"Total Atoms:", atoms.len()]);
    summary_table.add_row(
        row![b->"Dispersion Energy:", format!("{:.prec$} Eh", energy, prec = precision)],
    );
    summary_table.add_row(row![b->"", format!("{:.prec$} kcal/mol", energy * HARTREE_TO_KCALMOL, prec = precision)]);
    summary_table.print(writer)?;
    writeln!(writer)?;

    let mut data_table = Table::new();
    data_table.set_format(box_format);
    match &result.gradient {
        Some(_) => data_table.set_titles(row![
            bc->"Index", bc->"Element", bc->"Energy (Eh)",
            bc->"dE/dx (Eh/a0)", bc->"dE/dy (Eh/a0)", bc->"dE/dz (Eh/a0)"
        ]),
        None => data_table.set_titles(row![bc->"Index", bc->"Element", bc->"Energy (Eh)"]),
    }

    for (i, (atom, &e)) in atoms.iter().zip(&result.energies).enumerate() {
        let mut cells = row![r->i, l->symbol(atom), r->format!("{:.prec$}", e, prec = precision)];
        if let Some(gradient) = &result.gradient {
            for g in gradient[i] {
                cells.add_cell(cell!(r->format!("{:.prec$}", g, prec = precision)));
            }
        }
        data_table.add_row(cells);
    }

    data_table.print(writer)?;

    Ok(())
}

fn write_csv(
    writer: &mut dyn Write,
    atoms: &[Atom],
    result: &DispersionResult,
    precision: usize,
) -> Result<(), CliError> {
    match result.gradient {
        Some(_) => writeln!(writer, "index,element,energy,gx,gy,gz")?,
        None => writeln!(writer, "index,element,energy")?,
    }
    for (i, (atom, &e)) in atoms.iter().zip(&result.energies).enumerate() {
        write!(writer, "{},{},{:.*}", i, symbol(atom), precision, e)?;
        if let Some(gradient) = &result.gradient {
            for g in gradient[i] {
                write!(writer, ",{:.*}", precision, g)?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_json(
    writer: &mut dyn Write,
    atoms: &[Atom],
    result: &DispersionResult,
    summary: &Summary<'_>,
    precision: usize,
) -> Result<(), CliError> {
    writeln!(writer, "{{")?;
    writeln!(writer, "  \"functional\": \"{}\",", summary.functional)?;
    writeln!(writer, "  \"reference\": \"{}\",", summary.reference.replace('"', "\\\""))?;
    writeln!(writer, "  \"atoms\": [")?;
    for (i, (atom, &e)) in atoms.iter().zip(&result.energies).enumerate() {
        let comma = if i < atoms.len() - 1 { "," } else { "" };
        writeln!(writer, "    {{")?;
        writeln!(writer, "      \"index\": {},", i)?;
        writeln!(writer, "      \"element\": \"{}\",", symbol(atom))?;
        match &result.gradient {
            Some(gradient) => {
                writeln!(writer, "      \"energy\": {:.*},", precision, e)?;
                let g = gradient[i];
                writeln!(
                    writer,
                    "      \"gradient\": [{:.*}, {:.*}, {:.*}]",
                    precision, g[0], precision, g[1], precision, g[2]
                )?;
            }
            None => writeln!(writer, "      \"energy\": {:.*}", precision, e)?,
        }
        writeln!(writer, "    }}{}", comma)?;
    }
    writeln!(writer, "  ],")?;
    writeln!(writer, "  \"energy\": {:.*}", precision, result.energy())?;
    writeln!(writer, "}}")?;
    Ok(())
}
