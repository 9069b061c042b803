//! Element symbol lookup.

const SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Converts a case-sensitive element symbol (e.g. `"Cl"`) to its atomic number.
pub fn symbol_to_atomic_number(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .position(|&s| s == symbol)
        .map(|idx| (idx + 1) as u8)
}

/// Converts an element symbol in any letter case (e.g. `"CL"`, `"cl"`) to its atomic number.
pub fn symbol_to_atomic_number_ignore_case(symbol: &str) -> Option<u8> {
    SYMBOLS
        .iter()
        .position(|s| s.eq_ignore_ascii_case(symbol))
        .map(|idx| (idx + 1) as u8)
}

/// Returns the element symbol for an atomic number between 1 and 118.
pub fn atomic_number_to_symbol(atomic_number: u8) -> Option<&'static str> {
    match atomic_number {
        0 => None,
        z => SYMBOLS.get(z as usize - 1).copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_to_atomic_number() {
        assert_eq!(symbol_to_atomic_number("H"), Some(1));
        assert_eq!(symbol_to_atomic_number("O"), Some(8));
        assert_eq!(symbol_to_atomic_number("Fe"), Some(26));
        assert_eq!(symbol_to_atomic_number("Og"), Some(118));
        assert_eq!(symbol_to_atomic_number("Xx"), None);
        assert_eq!(symbol_to_atomic_number("h"), None);
    }

    #[test]
    fn test_ignore_case_lookup() {
        assert_eq!(symbol_to_atomic_number_ignore_case("CL"), Some(17));
        assert_eq!(symbol_to_atomic_number_ignore_case("si"), Some(14));
        assert_eq!(symbol_to_atomic_number_ignore_case("Q"), None);
    }

    #[test]
    fn test_atomic_number_to_symbol() {
        assert_eq!(atomic_number_to_symbol(1), Some("H"));
        assert_eq!(atomic_number_to_symbol(17), Some("Cl"));
        assert_eq!(atomic_number_to_symbol(118), Some("Og"));
        assert_eq!(atomic_number_to_symbol(0), None);
        assert_eq!(atomic_number_to_symbol(119), None);
    }
}
