//! Light/heavy partitioning of the elements present in a structure.
//!
//! Heavy atoms are the ones that receive the ECP basis set. The cut-off is an
//! atomic number: 37 (Rb and beyond) by default, or 19 (K and beyond) when ECPs
//! are also requested for the 3d-metal row.

use crate::elements::{self, GHOST};
use log::debug;
use std::collections::BTreeSet;

/// Atomic-number cut-off separating light atoms from heavy atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeavyAtomThreshold(usize);

impl HeavyAtomThreshold {
    /// Heavy atoms start at K (Z = 19).
    pub const FROM_3D_ROW: HeavyAtomThreshold = HeavyAtomThreshold(19);
    /// Heavy atoms start at Rb (Z = 37).
    pub const FROM_4D_ROW: HeavyAtomThreshold = HeavyAtomThreshold(37);

    /// Selects the threshold from the "ECP for 3d metals" option.
    pub fn from_ecp_for_3d(ecp_for_3d: bool) -> Self {
        if ecp_for_3d {
            Self::FROM_3D_ROW
        } else {
            Self::FROM_4D_ROW
        }
    }

    /// First atomic number classified as heavy.
    pub fn atomic_number(self) -> usize {
        self.0
    }
}

/// Distinct element symbols of a structure, split into light and heavy subsets.
///
/// Both lists are ordered by ascending atomic number, not by order of
/// appearance, and are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomSet {
    /// Elements below the threshold
    pub light: Vec<String>,
    /// Elements at or above the threshold
    pub heavy: Vec<String>,
}

impl AtomSet {
    /// True when neither subset contains an element.
    pub fn is_empty(&self) -> bool {
        self.light.is_empty() && self.heavy.is_empty()
    }
}

/// Classifies the elements of `structure` into light and heavy atoms.
///
/// Each line is expected to start with an element symbol, matched
/// case-insensitively. Ghost atoms, blank lines and unrecognized symbols are
/// skipped without error.
///
/// # Examples
///
/// ```
/// use gauprep::classifier::{classify, HeavyAtomThreshold};
///
/// let structure = vec![
///     "Pd   0.0 0.0 0.0".to_string(),
///     "c    1.9 0.0 0.0".to_string(),
///     "H    2.9 0.0 0.0".to_string(),
/// ];
/// let atoms = classify(&structure, HeavyAtomThreshold::FROM_4D_ROW);
/// assert_eq!(atoms.light, vec!["H", "C"]);
/// assert_eq!(atoms.heavy, vec!["Pd"]);
/// ```
pub fn classify<S: AsRef<str>>(structure: &[S], threshold: HeavyAtomThreshold) -> AtomSet {
    let mut present = BTreeSet::new();

    for line in structure {
        let Some(label) = line.as_ref().split_whitespace().next() else {
            continue;
        };
        match elements::atomic_number(label) {
            Some(GHOST) => {}
            Some(number) => {
                present.insert(number);
            }
            None => debug!("Skipping unrecognized atom label '{}'", label),
        }
    }

    let mut atoms = AtomSet::default();
    for number in present {
        let Some(symbol) = elements::symbol(number) else {
            continue;
        };
        if number < threshold.atomic_number() {
            atoms.light.push(symbol.to_string());
        } else {
            atoms.heavy.push(symbol.to_string());
        }
    }
    atoms
}
