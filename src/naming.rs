//! File names derived from the deck's output path
//!
//! Every file referenced from inside a deck (checkpoint, wavefunction output)
//! is named after the stem of the deck file itself, so that several decks can
//! live in the same directory without clobbering each other's files.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use gauprep::naming::FileNaming;
//!
//! let naming = FileNaming::new(Path::new("runs/pd_complex_ts.gjf"));
//!
//! assert_eq!(naming.basename(), "pd_complex_ts");
//! assert_eq!(naming.chk(), "pd_complex_ts.chk");
//! assert_eq!(naming.wfx(), "pd_complex_ts.wfx");
//! ```

use std::path::{Path, PathBuf};

/// Extension of composed deck files.
pub const DECK_EXTENSION: &str = "gjf";

/// Basename used when a path has no usable file stem.
const FALLBACK_BASENAME: &str = "gauprep_job";

/// Derives file names from the stem of a deck path
#[derive(Debug, Clone)]
pub struct FileNaming {
    basename: String,
}

impl FileNaming {
    /// Creates a FileNaming instance from a deck path
    ///
    /// Only the file stem is kept; directories and the extension are dropped.
    pub fn new(deck_path: &Path) -> Self {
        let basename = deck_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(FALLBACK_BASENAME)
            .to_string();

        Self { basename }
    }

    /// Creates a FileNaming instance from a bare stem
    pub fn from_stem(stem: &str) -> Self {
        let stem = stem.trim();
        Self {
            basename: if stem.is_empty() {
                FALLBACK_BASENAME.to_string()
            } else {
                stem.to_string()
            },
        }
    }

    /// Returns the basename used for file naming
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Checkpoint file written by every phase
    ///
    /// Format: `{basename}.chk`
    pub fn chk(&self) -> String {
        format!("{}.chk", self.basename)
    }

    /// Wavefunction file requested by WFX jobs
    ///
    /// Format: `{basename}.wfx`
    pub fn wfx(&self) -> String {
        format!("{}.wfx", self.basename)
    }

    /// Default deck path for a structure file: same directory and stem, `.gjf`
    /// extension
    ///
    /// # Example
    ///
    /// ```
    /// use std::path::{Path, PathBuf};
    /// use gauprep::naming::FileNaming;
    ///
    /// assert_eq!(
    ///     FileNaming::default_deck_path(Path::new("opt/water.log")),
    ///     PathBuf::from("opt/water.gjf")
    /// );
    /// ```
    pub fn default_deck_path(structure_path: &Path) -> PathBuf {
        structure_path.with_extension(DECK_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_extraction() {
        let naming = FileNaming::new(Path::new("compound_xyz_123.gjf"));
        assert_eq!(naming.basename(), "compound_xyz_123");
    }

    #[test]
    fn test_names_ignore_directories() {
        let naming = FileNaming::new(Path::new("/path/to/calc_001.com"));
        assert_eq!(naming.chk(), "calc_001.chk");
        assert_eq!(naming.wfx(), "calc_001.wfx");
    }

    #[test]
    fn test_names_with_different_extensions() {
        assert_eq!(FileNaming::new(Path::new("test.inp")).chk(), "test.chk");
        assert_eq!(FileNaming::new(Path::new("molecule")).chk(), "molecule.chk");
        assert_eq!(FileNaming::new(Path::new("a.b.gjf")).chk(), "a.b.chk");
    }

    #[test]
    fn test_fallback_basename() {
        assert_eq!(FileNaming::new(Path::new("/")).basename(), FALLBACK_BASENAME);
        assert_eq!(FileNaming::from_stem("  ").basename(), FALLBACK_BASENAME);
        assert_eq!(FileNaming::from_stem("ts1").wfx(), "ts1.wfx");
    }

    #[test]
    fn test_default_deck_path() {
        assert_eq!(
            FileNaming::default_deck_path(Path::new("water.xyz")),
            PathBuf::from("water.gjf")
        );
        assert_eq!(
            FileNaming::default_deck_path(Path::new("water")),
            PathBuf::from("water.gjf")
        );
    }
}
