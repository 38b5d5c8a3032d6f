//! Periodic table lookups used by structure classification and basis libraries.
//!
//! The table is ordered by atomic number. Index 0 holds the ghost atom `Bq`,
//! which never counts as a real element: it is excluded from classification and
//! is not accepted as the symbol of a basis-library block.

/// Element symbols indexed by atomic number (index 0 is the ghost atom).
pub const ELEMENTS: [&str; 113] = [
    "Bq", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
];

/// Atomic number of the ghost atom.
pub const GHOST: usize = 0;

/// Returns the atomic number for a symbol, matched case-insensitively.
///
/// The ghost atom `Bq` maps to [`GHOST`].
///
/// # Examples
///
/// ```
/// use gauprep::elements::atomic_number;
///
/// assert_eq!(atomic_number("fe"), Some(26));
/// assert_eq!(atomic_number("BQ"), Some(0));
/// assert_eq!(atomic_number("Xx"), None);
/// ```
pub fn atomic_number(symbol: &str) -> Option<usize> {
    ELEMENTS
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(symbol))
}

/// Returns the canonical symbol for an atomic number.
pub fn symbol(atomic_number: usize) -> Option<&'static str> {
    ELEMENTS.get(atomic_number).copied()
}

/// Returns true when `symbol` names a real element (the ghost atom is excluded).
pub fn is_element(symbol: &str) -> bool {
    matches!(atomic_number(symbol), Some(n) if n != GHOST)
}

/// Upper-cases the first character and lower-cases the rest (`"FE"` -> `"Fe"`).
///
/// This is the key normalization used by basis libraries, so it is applied even
/// to strings that are not element symbols.
pub fn capitalize(symbol: &str) -> String {
    let mut chars = symbol.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_ordered_by_atomic_number() {
        assert_eq!(symbol(1), Some("H"));
        assert_eq!(symbol(19), Some("K"));
        assert_eq!(symbol(37), Some("Rb"));
        assert_eq!(symbol(112), Some("Cn"));
        assert_eq!(symbol(113), None);
    }

    #[test]
    fn test_ghost_is_not_an_element() {
        assert_eq!(atomic_number("bq"), Some(GHOST));
        assert!(!is_element("Bq"));
        assert!(is_element("cl"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("FE"), "Fe");
        assert_eq!(capitalize("h"), "H");
        assert_eq!(capitalize(""), "");
    }
}
