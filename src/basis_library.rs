//! Reader for external basis-set libraries in Gaussian `.gbs` format.
//!
//! A library file holds two sections separated by the first blank line:
//!
//! ```text
//! ! optional comment lines
//! H     0
//! S   3   1.00
//!       ...
//! ****
//! Pd     0
//! ...
//! ****
//!
//! PD     0
//! PD-ECP     3     28
//! ...
//! ```
//!
//! The basis section is a sequence of blocks, each opened by a start line
//! (`<element> 0`) and closed by a `****` line. The ECP section after the blank
//! line is a sequence of blocks opened by start lines and ended by the next
//! blank line. Blocks are stored verbatim (start and terminator lines
//! included) under the capitalized element symbol, so that they can be pasted
//! back into an input deck unchanged.
//!
//! Libraries are read-only after construction.

use crate::elements;
use log::debug;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extension of basis-set library files.
pub const LIBRARY_EXTENSION: &str = "gbs";

/// Error type for basis library operations.
#[derive(Error, Debug)]
pub enum BasisLibraryError {
    /// The library file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A basis block does not begin with an `<element> 0` start line
    #[error(
        "GBS format error in {} (line {line_number}): expected '<element> 0', found '{line}'",
        .path.display()
    )]
    Format {
        /// Library file
        path: PathBuf,
        /// 1-based line number
        line_number: usize,
        /// Offending line, trimmed
        line: String,
    },
    /// A basis block ended before its `****` terminator
    #[error("GBS format error in {}: basis block for {atom} is not terminated by '****'", .path.display())]
    Unterminated {
        /// Library file
        path: PathBuf,
        /// Element of the open block
        atom: String,
    },
    /// The library has no basis functions for a requested element
    #[error("Basis functions for {atom} are not found in {}", .path.display())]
    MissingAtom {
        /// Requested element
        atom: String,
        /// Library file
        path: PathBuf,
    },
}

type Result<T> = std::result::Result<T, BasisLibraryError>;

/// Scanner position while reading a library file.
enum ScanState {
    /// Skipping leading comments and blank lines
    Header,
    /// Between basis blocks; a blank line ends the basis section
    BasisStart,
    /// Inside a basis block
    BasisBlock { atom: String, text: String },
    /// Inside the ECP section, possibly within a block
    Ecp { current: Option<(String, String)> },
    /// ECP section finished; the rest of the file is ignored
    Done,
}

/// Per-element basis and ECP text parsed from one library file.
#[derive(Debug, Clone)]
pub struct BasisLibrary {
    path: PathBuf,
    basis: BTreeMap<String, String>,
    ecp: BTreeMap<String, String>,
}

impl BasisLibrary {
    /// Reads and parses a library file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let content = fs::read_to_string(&path)?;
        Self::parse(&content, path)
    }

    /// Parses library text; `path` is only used in error messages.
    ///
    /// # Errors
    ///
    /// - [`BasisLibraryError::Format`] when the first line of a basis block is
    ///   not a start line
    /// - [`BasisLibraryError::Unterminated`] when a basis block has no `****`
    pub fn parse(content: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let mut library = Self {
            path: path.into(),
            basis: BTreeMap::new(),
            ecp: BTreeMap::new(),
        };

        let mut state = ScanState::Header;
        for (index, line) in content.split_inclusive('\n').enumerate() {
            if matches!(state, ScanState::Done) {
                break;
            }
            let trimmed = line.trim();
            state = match state {
                ScanState::Header if trimmed.is_empty() || trimmed.starts_with('!') => {
                    ScanState::Header
                }
                ScanState::Header => library.open_basis_block(index, line)?,
                ScanState::BasisStart if trimmed.is_empty() => ScanState::Ecp { current: None },
                ScanState::BasisStart => library.open_basis_block(index, line)?,
                ScanState::BasisBlock { atom, .. } if trimmed.is_empty() => {
                    return Err(library.unterminated(atom));
                }
                ScanState::BasisBlock { atom, mut text } => {
                    text.push_str(line);
                    if trimmed.starts_with("****") {
                        library.basis.insert(atom, text);
                        ScanState::BasisStart
                    } else {
                        ScanState::BasisBlock { atom, text }
                    }
                }
                ScanState::Ecp { current } if trimmed.is_empty() => {
                    library.close_ecp_block(current);
                    ScanState::Done
                }
                ScanState::Ecp { current } => match start_line_atom(line) {
                    Some(atom) => {
                        library.close_ecp_block(current);
                        ScanState::Ecp {
                            current: Some((atom, line.to_string())),
                        }
                    }
                    None => ScanState::Ecp {
                        current: current.map(|(atom, mut text)| {
                            text.push_str(line);
                            (atom, text)
                        }),
                    },
                },
                ScanState::Done => ScanState::Done,
            };
        }

        match state {
            ScanState::BasisBlock { atom, .. } => return Err(library.unterminated(atom)),
            ScanState::Ecp { current } => library.close_ecp_block(current),
            _ => {}
        }

        debug!(
            "Loaded basis library {} ({} basis entries, {} ECP entries)",
            library.path.display(),
            library.basis.len(),
            library.ecp.len()
        );
        Ok(library)
    }

    fn open_basis_block(&self, index: usize, line: &str) -> Result<ScanState> {
        match start_line_atom(line) {
            Some(atom) => Ok(ScanState::BasisBlock {
                atom,
                text: line.to_string(),
            }),
            None => Err(BasisLibraryError::Format {
                path: self.path.clone(),
                line_number: index + 1,
                line: line.trim().to_string(),
            }),
        }
    }

    fn close_ecp_block(&mut self, block: Option<(String, String)>) {
        if let Some((atom, text)) = block {
            self.ecp.insert(atom, text);
        }
    }

    fn unterminated(&self, atom: String) -> BasisLibraryError {
        BasisLibraryError::Unterminated {
            path: self.path.clone(),
            atom,
        }
    }

    /// Path of the library file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Elements that have basis functions in this library.
    pub fn atoms(&self) -> impl Iterator<Item = &str> {
        self.basis.keys().map(String::as_str)
    }

    /// Raw basis block of one element.
    pub fn basis_for(&self, atom: &str) -> Option<&str> {
        self.basis.get(&elements::capitalize(atom)).map(String::as_str)
    }

    /// Raw ECP block of one element, if the library has one.
    pub fn ecp_for(&self, atom: &str) -> Option<&str> {
        self.ecp.get(&elements::capitalize(atom)).map(String::as_str)
    }

    /// Concatenates the basis blocks of `atoms` in the given order.
    ///
    /// # Errors
    ///
    /// [`BasisLibraryError::MissingAtom`] for the first element without a block.
    pub fn get_basis<S: AsRef<str>>(&self, atoms: &[S]) -> Result<String> {
        let mut text = String::new();
        for atom in atoms {
            let atom = atom.as_ref();
            let block = self
                .basis_for(atom)
                .ok_or_else(|| BasisLibraryError::MissingAtom {
                    atom: elements::capitalize(atom),
                    path: self.path.clone(),
                })?;
            text.push_str(block);
        }
        Ok(text)
    }

    /// Concatenates the ECP blocks of `atoms` in the given order.
    ///
    /// Elements without an ECP entry contribute nothing.
    pub fn get_ecp<S: AsRef<str>>(&self, atoms: &[S]) -> String {
        atoms
            .iter()
            .filter_map(|atom| self.ecp_for(atom.as_ref()))
            .collect()
    }
}

/// Returns the capitalized element of a `<element> 0` start line.
fn start_line_atom(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(atom), Some("0"), None) if elements::is_element(atom) => {
            Some(elements::capitalize(atom))
        }
        _ => None,
    }
}

/// Looks for `<name>.gbs` in `dir`, comparing file stems case-insensitively.
///
/// Returns `None` when the directory does not exist or has no matching file.
pub fn find_external_library(name: &str, dir: &Path) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("External basis directory {} unavailable: {}", dir.display(), e);
            return None;
        }
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(LIBRARY_EXTENSION))
        .filter(|path| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(|stem| stem.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .collect();
    matches.sort();

    let found = matches.into_iter().next();
    if let Some(path) = &found {
        debug!("Basis '{}' resolved to external library {}", name, path.display());
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = "\
! test library
!

H     0
S   1   1.00
      0.1220000              1.0000000
****
pd 0
S   1   1.00
      0.0500000              1.0000000
****
I     0
P   1   1.00
      0.0400000              1.0000000
****

PD     0
PD-ECP     1     28
f potential
  1
2      1.0000000              0.0000000
I     0
I-ECP     1     28
f potential
  1
2      2.0000000              0.0000000

ignored trailing text
";

    fn library() -> BasisLibrary {
        BasisLibrary::parse(LIBRARY, "test.gbs").unwrap()
    }

    #[test]
    fn test_basis_blocks_are_stored_verbatim() {
        let lib = library();
        assert_eq!(lib.atoms().collect::<Vec<_>>(), vec!["H", "I", "Pd"]);
        assert_eq!(
            lib.basis_for("h").unwrap(),
            "H     0\nS   1   1.00\n      0.1220000              1.0000000\n****\n"
        );
        assert!(lib.basis_for("PD").unwrap().starts_with("pd 0\n"));
    }

    #[test]
    fn test_ecp_blocks_split_on_start_lines() {
        let lib = library();
        assert_eq!(
            lib.ecp_for("Pd").unwrap(),
            "PD     0\nPD-ECP     1     28\nf potential\n  1\n2      1.0000000              0.0000000\n"
        );
        assert!(lib.ecp_for("I").unwrap().starts_with("I     0\nI-ECP"));
        assert!(lib.ecp_for("H").is_none());
    }

    #[test]
    fn test_get_basis_concatenates_in_requested_order() {
        let lib = library();
        let text = lib.get_basis(&["I", "H"]).unwrap();
        let expected = format!(
            "{}{}",
            lib.basis_for("I").unwrap(),
            lib.basis_for("H").unwrap()
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_get_basis_missing_atom() {
        let lib = library();
        match lib.get_basis(&["H", "Fe"]) {
            Err(BasisLibraryError::MissingAtom { atom, path }) => {
                assert_eq!(atom, "Fe");
                assert_eq!(path, PathBuf::from("test.gbs"));
            }
            other => panic!("Expected MissingAtom, got {:?}", other),
        }
    }

    #[test]
    fn test_get_ecp_skips_atoms_without_ecp() {
        let lib = library();
        assert_eq!(lib.get_ecp(&["H"]), "");
        let text = lib.get_ecp(&["H", "Pd", "Fe", "I"]);
        assert_eq!(
            text,
            format!("{}{}", lib.ecp_for("Pd").unwrap(), lib.ecp_for("I").unwrap())
        );
    }

    #[test]
    fn test_library_without_ecp_section() {
        let lib = BasisLibrary::parse("C 0\nS 1 1.00\n 1.0 1.0\n****\n", "c.gbs").unwrap();
        assert!(lib.basis_for("C").is_some());
        assert_eq!(lib.get_ecp(&["C"]), "");
    }

    #[test]
    fn test_bad_start_line_is_format_error() {
        let err = BasisLibrary::parse("! header\nH 1\nS 1 1.00\n****\n", "bad.gbs").unwrap_err();
        match err {
            BasisLibraryError::Format {
                line_number, line, ..
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "H 1");
            }
            other => panic!("Expected Format, got {:?}", other),
        }

        assert!(matches!(
            BasisLibrary::parse("Bq 0\n****\n", "ghost.gbs"),
            Err(BasisLibraryError::Format { .. })
        ));
    }

    #[test]
    fn test_unterminated_block() {
        let err = BasisLibrary::parse("H 0\nS 1 1.00\n\nH 0\n", "open.gbs").unwrap_err();
        assert!(matches!(err, BasisLibraryError::Unterminated { ref atom, .. } if atom == "H"));
    }

    #[test]
    fn test_find_external_library_is_case_insensitive() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("Def2-TZVP.gbs"), "H 0\n****\n").unwrap();
        fs::write(dir.path().join("other.txt"), "").unwrap();

        let found = find_external_library("def2-tzvp", dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "Def2-TZVP.gbs");
        assert!(find_external_library("other", dir.path()).is_none());
        assert!(find_external_library("def2-tzvp", &dir.path().join("missing")).is_none());
    }

    #[test]
    fn test_from_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lib.gbs");
        fs::write(&path, LIBRARY).unwrap();
        let lib = BasisLibrary::from_file(&path).unwrap();
        assert_eq!(lib.get_basis(&["H"]).unwrap(), library().get_basis(&["H"]).unwrap());
    }
}
