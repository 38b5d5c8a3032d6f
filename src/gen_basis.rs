//! Mixed ("Gen") basis-set assignment.
//!
//! A deck needs explicit per-atom basis text when the light and heavy atoms of
//! a structure use different basis sets, or when a basis set comes from an
//! external library file instead of the engine's built-in sets. This module
//! decides whether that is the case and produces the text.
//!
//! The decision depends on which atom subsets are present and on where each
//! basis set comes from ([`BasisSource`]):
//!
//! | light set | heavy set | light basis | heavy basis | result                     |
//! |-----------|-----------|-------------|-------------|----------------------------|
//! | any       | empty     | built-in    | any         | no Gen                     |
//! | empty     | any       | any         | built-in    | no Gen                     |
//! | any       | any       | built-in, same name as heavy | any | no Gen         |
//! | present   | empty     | external    | any         | light library              |
//! | empty     | present   | any         | external    | heavy library              |
//! | present   | present   | built-in    | built-in    | inline light + heavy       |
//! | present   | present   | external    | external    | both libraries             |
//! | present   | present   | built-in    | external    | inline light, heavy library |
//! | present   | present   | external    | built-in    | inline heavy, light library |
//!
//! A built-in heavy basis is assumed to carry a pseudopotential, so inline
//! heavy atoms always get an inline ECP block.

use crate::basis_library::{find_external_library, BasisLibrary, BasisLibraryError};
use crate::classifier::AtomSet;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, BasisLibraryError>;

/// Where the functions of a named basis set come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasisSource {
    /// Known to the engine by name
    BuiltIn,
    /// Read from a `.gbs` library file
    External(PathBuf),
}

/// A basis-set name and its resolved source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisChoice {
    /// Name as given in the options
    pub name: String,
    /// Built-in or library file
    pub source: BasisSource,
}

impl BasisChoice {
    /// Resolves `name` against the library files in `library_dir`.
    pub fn resolve(name: &str, library_dir: &Path) -> Self {
        let source = match find_external_library(name, library_dir) {
            Some(path) => BasisSource::External(path),
            None => BasisSource::BuiltIn,
        };
        Self {
            name: name.to_string(),
            source,
        }
    }

    /// A choice that never refers to a library file.
    pub fn built_in(name: &str) -> Self {
        Self {
            name: name.to_string(),
            source: BasisSource::BuiltIn,
        }
    }

    /// True when the basis set comes from a library file.
    pub fn is_external(&self) -> bool {
        matches!(self.source, BasisSource::External(_))
    }
}

/// Which combination of sources produced the Gen text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenCase {
    /// Light atoms only, external light basis
    LightLibrary,
    /// Heavy atoms only, external heavy basis
    HeavyLibrary,
    /// Both subsets, both basis sets built in
    BothInline,
    /// Both subsets, both basis sets external
    BothLibraries,
    /// Both subsets, light built in, heavy external
    InlineLightHeavyLibrary,
    /// Both subsets, light external, heavy built in
    LightLibraryInlineHeavy,
}

impl fmt::Display for GenCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            GenCase::LightLibrary => "light atoms from library",
            GenCase::HeavyLibrary => "heavy atoms from library",
            GenCase::BothInline => "light and heavy atoms inline",
            GenCase::BothLibraries => "light and heavy atoms from libraries",
            GenCase::InlineLightHeavyLibrary => "light atoms inline, heavy atoms from library",
            GenCase::LightLibraryInlineHeavy => "light atoms from library, heavy atoms inline",
        };
        f.write_str(description)
    }
}

/// Explicit basis and ECP text for a deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenBasis {
    case: GenCase,
    basis_text: String,
    ecp_text: String,
    description: String,
}

impl GenBasis {
    /// Combination of sources used.
    pub fn case(&self) -> GenCase {
        self.case
    }

    /// Basis-function section.
    pub fn basis_text(&self) -> &str {
        &self.basis_text
    }

    /// Pseudopotential section, empty when no atom has an ECP.
    pub fn ecp_text(&self) -> &str {
        &self.ecp_text
    }

    /// True when the method term needs `Pseudo=read`.
    pub fn pseudo_read(&self) -> bool {
        !self.ecp_text.is_empty()
    }

    /// Text appended to the deck: basis section, then a blank line and the
    /// ECP section when there is one.
    pub fn text(&self) -> String {
        if self.ecp_text.is_empty() {
            self.basis_text.clone()
        } else {
            format!("{}\n{}", self.basis_text, self.ecp_text)
        }
    }

    /// Summary for `${GEN}` title placeholders, e.g.
    /// `def2SVP for H,C and LANL2DZ for Pd`.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Decides whether a Gen basis is needed and builds its text.
///
/// Library files are read only for the subsets that use them.
///
/// # Errors
///
/// Propagates [`BasisLibraryError`] from reading a library file, or
/// [`BasisLibraryError::MissingAtom`] when a library lacks a required element.
///
/// # Examples
///
/// ```
/// use gauprep::classifier::AtomSet;
/// use gauprep::gen_basis::{resolve_gen_basis, BasisChoice};
///
/// let atoms = AtomSet { light: vec!["H".into(), "C".into()], heavy: vec!["Pd".into()] };
/// let gen = resolve_gen_basis(
///     &atoms,
///     &BasisChoice::built_in("def2SVP"),
///     &BasisChoice::built_in("LANL2DZ"),
/// )?
/// .expect("different basis sets need Gen");
///
/// assert_eq!(gen.basis_text(), "H C 0\ndef2SVP\n****\nPd 0\nLANL2DZ\n****\n");
/// assert_eq!(gen.ecp_text(), "Pd 0\nLANL2DZ\n");
/// assert!(gen.pseudo_read());
/// assert_eq!(gen.description(), "def2SVP for H,C and LANL2DZ for Pd");
/// # Ok::<(), gauprep::basis_library::BasisLibraryError>(())
/// ```
pub fn resolve_gen_basis(
    atoms: &AtomSet,
    light: &BasisChoice,
    heavy: &BasisChoice,
) -> Result<Option<GenBasis>> {
    if atoms.is_empty() {
        return Ok(None);
    }
    let light_empty = atoms.light.is_empty();
    let heavy_empty = atoms.heavy.is_empty();

    let (case, basis_text, ecp_text) = match (&light.source, &heavy.source) {
        (BasisSource::BuiltIn, _) if heavy_empty || light.name == heavy.name => {
            return Ok(None);
        }
        (_, BasisSource::BuiltIn) if light_empty => return Ok(None),
        (BasisSource::External(path), _) if heavy_empty => {
            let library = BasisLibrary::from_file(path)?;
            (
                GenCase::LightLibrary,
                library.get_basis(&atoms.light)?,
                library.get_ecp(&atoms.light),
            )
        }
        (_, BasisSource::External(path)) if light_empty => {
            let library = BasisLibrary::from_file(path)?;
            (
                GenCase::HeavyLibrary,
                library.get_basis(&atoms.heavy)?,
                library.get_ecp(&atoms.heavy),
            )
        }
        (BasisSource::BuiltIn, BasisSource::BuiltIn) => (
            GenCase::BothInline,
            inline_basis(&atoms.light, &light.name) + &inline_basis(&atoms.heavy, &heavy.name),
            inline_ecp(&atoms.heavy, &heavy.name),
        ),
        (BasisSource::External(light_path), BasisSource::External(heavy_path)) => {
            let light_library = BasisLibrary::from_file(light_path)?;
            let heavy_library = BasisLibrary::from_file(heavy_path)?;
            (
                GenCase::BothLibraries,
                light_library.get_basis(&atoms.light)? + &heavy_library.get_basis(&atoms.heavy)?,
                light_library.get_ecp(&atoms.light) + &heavy_library.get_ecp(&atoms.heavy),
            )
        }
        (BasisSource::BuiltIn, BasisSource::External(heavy_path)) => {
            let heavy_library = BasisLibrary::from_file(heavy_path)?;
            (
                GenCase::InlineLightHeavyLibrary,
                inline_basis(&atoms.light, &light.name) + &heavy_library.get_basis(&atoms.heavy)?,
                heavy_library.get_ecp(&atoms.heavy),
            )
        }
        (BasisSource::External(light_path), BasisSource::BuiltIn) => {
            let light_library = BasisLibrary::from_file(light_path)?;
            (
                GenCase::LightLibraryInlineHeavy,
                inline_basis(&atoms.heavy, &heavy.name) + &light_library.get_basis(&atoms.light)?,
                inline_ecp(&atoms.heavy, &heavy.name) + &light_library.get_ecp(&atoms.light),
            )
        }
    };

    debug!("Gen basis required: {}", case);
    Ok(Some(GenBasis {
        case,
        basis_text,
        ecp_text,
        description: describe(atoms, &light.name, &heavy.name),
    }))
}

/// Inline basis block assigning a built-in basis to several elements.
fn inline_basis(atoms: &[String], basis: &str) -> String {
    format!("{} 0\n{}\n****\n", atoms.join(" "), basis)
}

/// Inline ECP block assigning a built-in pseudopotential to several elements.
fn inline_ecp(atoms: &[String], basis: &str) -> String {
    format!("{} 0\n{}\n", atoms.join(" "), basis)
}

fn describe(atoms: &AtomSet, light_basis: &str, heavy_basis: &str) -> String {
    let mut parts = Vec::new();
    if !atoms.light.is_empty() {
        parts.push(format!("{} for {}", light_basis, atoms.light.join(",")));
    }
    if !atoms.heavy.is_empty() {
        parts.push(format!("{} for {}", heavy_basis, atoms.heavy.join(",")));
    }
    parts.join(" and ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LIGHT_GBS: &str = "\
H     0
S   1   1.00
      0.1220000              1.0000000
****
C     0
S   1   1.00
      0.2960000              1.0000000
****
";

    const HEAVY_GBS: &str = "\
PD     0
S   1   1.00
      0.0500000              1.0000000
****

PD     0
PD-ECP     1     28
f potential
  1
2      1.0000000              0.0000000
";

    fn atoms(light: &[&str], heavy: &[&str]) -> AtomSet {
        AtomSet {
            light: light.iter().map(|s| s.to_string()).collect(),
            heavy: heavy.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn library_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mylight.gbs"), LIGHT_GBS).unwrap();
        fs::write(dir.path().join("MyHeavy.gbs"), HEAVY_GBS).unwrap();
        dir
    }

    #[test]
    fn test_resolve_choice() {
        let dir = library_dir();
        assert!(BasisChoice::resolve("MYLIGHT", dir.path()).is_external());
        assert_eq!(
            BasisChoice::resolve("def2SVP", dir.path()).source,
            BasisSource::BuiltIn
        );
    }

    #[test]
    fn test_no_gen_cases() {
        let builtin_light = BasisChoice::built_in("def2SVP");
        let builtin_heavy = BasisChoice::built_in("LANL2DZ");

        // light only, built-in light basis
        assert!(resolve_gen_basis(&atoms(&["H", "C"], &[]), &builtin_light, &builtin_heavy)
            .unwrap()
            .is_none());
        // heavy only, built-in heavy basis
        assert!(resolve_gen_basis(&atoms(&[], &["Pd"]), &builtin_light, &builtin_heavy)
            .unwrap()
            .is_none());
        // same built-in basis for both subsets
        assert!(resolve_gen_basis(
            &atoms(&["H"], &["Pd"]),
            &builtin_light,
            &BasisChoice::built_in("def2SVP")
        )
        .unwrap()
        .is_none());
        assert!(resolve_gen_basis(&AtomSet::default(), &builtin_light, &builtin_heavy)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_light_library_only() {
        let dir = library_dir();
        let light = BasisChoice::resolve("mylight", dir.path());
        let gen = resolve_gen_basis(&atoms(&["H", "C"], &[]), &light, &BasisChoice::built_in("x"))
            .unwrap()
            .unwrap();
        assert_eq!(gen.case(), GenCase::LightLibrary);
        assert_eq!(gen.basis_text(), LIGHT_GBS);
        assert!(!gen.pseudo_read());
        assert_eq!(gen.text(), LIGHT_GBS);
        assert_eq!(gen.description(), "mylight for H,C");
    }

    #[test]
    fn test_heavy_library_only_with_ecp() {
        let dir = library_dir();
        let heavy = BasisChoice::resolve("myheavy", dir.path());
        let gen = resolve_gen_basis(&atoms(&[], &["Pd"]), &BasisChoice::built_in("def2SVP"), &heavy)
            .unwrap()
            .unwrap();
        assert_eq!(gen.case(), GenCase::HeavyLibrary);
        assert!(gen.pseudo_read());
        assert!(gen.ecp_text().starts_with("PD     0\nPD-ECP"));
        assert_eq!(gen.text(), format!("{}\n{}", gen.basis_text(), gen.ecp_text()));
    }

    #[test]
    fn test_both_inline() {
        let gen = resolve_gen_basis(
            &atoms(&["H", "C"], &["Pd", "I"]),
            &BasisChoice::built_in("def2SVP"),
            &BasisChoice::built_in("LANL2DZ"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(gen.case(), GenCase::BothInline);
        assert_eq!(
            gen.text(),
            "H C 0\ndef2SVP\n****\nPd I 0\nLANL2DZ\n****\n\nPd I 0\nLANL2DZ\n"
        );
    }

    #[test]
    fn test_both_libraries() {
        let dir = library_dir();
        let gen = resolve_gen_basis(
            &atoms(&["H"], &["Pd"]),
            &BasisChoice::resolve("mylight", dir.path()),
            &BasisChoice::resolve("myheavy", dir.path()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(gen.case(), GenCase::BothLibraries);
        assert!(gen.basis_text().starts_with("H     0\n"));
        assert!(gen.basis_text().ends_with("0.0500000              1.0000000\n****\n"));
        assert!(gen.pseudo_read());
    }

    #[test]
    fn test_inline_light_heavy_library() {
        let dir = library_dir();
        let gen = resolve_gen_basis(
            &atoms(&["H", "C"], &["Pd"]),
            &BasisChoice::built_in("def2SVP"),
            &BasisChoice::resolve("myheavy", dir.path()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(gen.case(), GenCase::InlineLightHeavyLibrary);
        assert!(gen.basis_text().starts_with("H C 0\ndef2SVP\n****\nPD     0\n"));
        assert!(!gen.ecp_text().contains("def2SVP"));
        assert!(gen.pseudo_read());
    }

    #[test]
    fn test_light_library_inline_heavy() {
        let dir = library_dir();
        let gen = resolve_gen_basis(
            &atoms(&["H"], &["Pd"]),
            &BasisChoice::resolve("mylight", dir.path()),
            &BasisChoice::built_in("LANL2DZ"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(gen.case(), GenCase::LightLibraryInlineHeavy);
        assert!(gen.basis_text().starts_with("Pd 0\nLANL2DZ\n****\nH     0\n"));
        // light library has no ECP section; only the inline heavy ECP remains
        assert_eq!(gen.ecp_text(), "Pd 0\nLANL2DZ\n");
        assert!(gen.pseudo_read());
        assert_eq!(gen.description(), "mylight for H and LANL2DZ for Pd");
    }

    #[test]
    fn test_missing_atom_in_library() {
        let dir = library_dir();
        let err = resolve_gen_basis(
            &atoms(&["H", "N"], &[]),
            &BasisChoice::resolve("mylight", dir.path()),
            &BasisChoice::built_in("LANL2DZ"),
        )
        .unwrap_err();
        assert!(matches!(err, BasisLibraryError::MissingAtom { ref atom, .. } if atom == "N"));
    }

    #[test]
    fn test_same_name_external_still_uses_library() {
        let dir = library_dir();
        let choice = BasisChoice::resolve("mylight", dir.path());
        let gen = resolve_gen_basis(&atoms(&["H"], &["Pd"]), &choice, &choice);
        // the light library has no Pd block
        assert!(matches!(gen, Err(BasisLibraryError::MissingAtom { .. })));
    }
}
