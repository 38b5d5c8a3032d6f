//! Charge, multiplicity and coordinates from existing calculation files.
//!
//! Three sources are understood, selected by file extension:
//!
//! - **Gaussian output** (`.log`, `.out`): the last `Charge = c Multiplicity = m`
//!   line and the last `Input orientation:` or `Standard orientation:` table
//! - **XYZ** (`.xyz`): the last frame of a possibly multi-frame file; charge 0
//!   and multiplicity 1 are assumed
//! - **Gaussian input** (anything else): the charge/multiplicity line and atom
//!   lines of the molecule specification
//!
//! # Examples
//!
//! ```no_run
//! use gauprep::structure_reader::read_single_file;
//! use std::path::Path;
//!
//! let data = read_single_file(Path::new("opt_water.log"))?;
//! println!("{} atoms, charge {}", data.structure.len(), data.charge);
//! # Ok::<(), gauprep::structure_reader::StructureError>(())
//! ```

use crate::config::{JobConfiguration, ValidationError};
use crate::elements;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for structure reading.
#[derive(Error, Debug)]
pub enum StructureError {
    /// I/O error when reading the file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file does not contain a readable structure
    #[error("Parse error: {0}")]
    Parse(String),
}

type Result<T> = std::result::Result<T, StructureError>;

/// Charge, multiplicity and atom lines read from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureData {
    /// Total charge
    pub charge: i32,
    /// Spin multiplicity, not yet validated
    pub multiplicity: i64,
    /// Atom lines without line terminators
    pub structure: Vec<String>,
}

impl StructureData {
    /// Validates the data into a job configuration with default options.
    pub fn into_configuration(self) -> std::result::Result<JobConfiguration, ValidationError> {
        JobConfiguration::new(self.charge, self.multiplicity, self.structure)
    }
}

lazy_static! {
    // " Charge =  0 Multiplicity = 1"
    static ref CHARGE_MULT_RE: Regex =
        Regex::new(r"Charge\s*=\s*(-?\d+)\s+Multiplicity\s*=\s*(\d+)").unwrap();

    // Orientation row: " 1 8 0 0.000000 0.000000 0.117300"
    static ref ORIENTATION_ROW_RE: Regex =
        Regex::new(r"^\s*\d+\s+(\d+)\s+-?\d+\s+(\S+)\s+(\S+)\s+(\S+)").unwrap();
}

/// Header lines between an orientation banner and its first row.
const ORIENTATION_HEADER_LINES: usize = 5;

/// Reads the final structure of a Gaussian output file.
pub fn read_gaussian_log(path: &Path) -> Result<StructureData> {
    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();

    let mut orientation = None;
    let mut charge_mult = None;
    for (index, line) in lines.iter().enumerate() {
        if line.contains("Input orientation:") || line.contains("Standard orientation:") {
            orientation = Some(index);
        } else if let Some(caps) = CHARGE_MULT_RE.captures(line) {
            charge_mult = Some((caps[1].to_string(), caps[2].to_string()));
        }
    }

    let (charge, multiplicity) = charge_mult.ok_or_else(|| {
        StructureError::Parse(format!("No charge/multiplicity line in {}", path.display()))
    })?;
    let start = orientation.ok_or_else(|| {
        StructureError::Parse(format!("No orientation table in {}", path.display()))
    })? + ORIENTATION_HEADER_LINES;

    let mut structure = Vec::new();
    for line in lines.iter().skip(start) {
        if line.trim().is_empty() || line.contains("-----") {
            break;
        }
        let caps = ORIENTATION_ROW_RE.captures(line).ok_or_else(|| {
            StructureError::Parse(format!("Malformed orientation row: '{}'", line.trim()))
        })?;
        let symbol = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(elements::symbol)
            .ok_or_else(|| StructureError::Parse(format!("Unknown atomic number {}", &caps[1])))?;
        structure.push(format!(
            "{:<10} {:>12} {:>12} {:>12}",
            symbol,
            &caps[2],
            &caps[3],
            &caps[4]
        ));
    }

    debug!("Read {} atoms from Gaussian output {}", structure.len(), path.display());
    Ok(StructureData {
        charge: parse_int(&charge, "charge")?,
        multiplicity: parse_int(&multiplicity, "multiplicity")?,
        structure,
    })
}

/// Position within a Gaussian input file.
enum InputSection {
    /// Link 0 commands before the route
    BeforeRoute,
    /// Route lines up to the first blank line
    Route,
    /// Title lines up to the next blank line
    Title,
    /// Charge/multiplicity line and atoms
    Molecule,
}

/// Reads the molecule specification of a Gaussian input file.
pub fn read_gaussian_input(path: &Path) -> Result<StructureData> {
    let content = fs::read_to_string(path)?;

    let mut section = InputSection::BeforeRoute;
    let mut molecule: Vec<&str> = Vec::new();
    let mut previous_blank = false;

    for raw in content.lines() {
        let line = raw.trim_start();
        let blank = line.trim().is_empty();
        if !blank && line.starts_with('!') {
            continue;
        }
        // runs of blank lines count once
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;

        section = match section {
            InputSection::BeforeRoute if line.starts_with('#') => InputSection::Route,
            InputSection::BeforeRoute => InputSection::BeforeRoute,
            InputSection::Route if blank => InputSection::Title,
            InputSection::Route => InputSection::Route,
            InputSection::Title if blank => InputSection::Molecule,
            InputSection::Title => InputSection::Title,
            InputSection::Molecule if blank => break,
            InputSection::Molecule => {
                let lone_pair = line
                    .get(..2)
                    .map_or(false, |prefix| prefix.eq_ignore_ascii_case("LP"));
                if !lone_pair {
                    molecule.push(line.trim_end());
                }
                InputSection::Molecule
            }
        };
    }

    let (first, atoms) = molecule.split_first().ok_or_else(|| {
        StructureError::Parse(format!("No molecule specification in {}", path.display()))
    })?;
    let mut tokens = first.split_whitespace();
    let (charge, multiplicity) = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(charge), Some(multiplicity), None) => (
            parse_int(charge, "charge")?,
            parse_int(multiplicity, "multiplicity")?,
        ),
        _ => {
            return Err(StructureError::Parse(format!(
                "Expected '<charge> <multiplicity>', found '{}'",
                first
            )))
        }
    };

    debug!("Read {} atoms from Gaussian input {}", atoms.len(), path.display());
    Ok(StructureData {
        charge,
        multiplicity,
        structure: atoms.iter().map(|line| line.to_string()).collect(),
    })
}

/// Reads every frame of an XYZ file.
pub fn read_xyz(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();

    let mut frames = Vec::new();
    let mut index = 0;
    while index < lines.len() {
        let header = lines[index].trim();
        if header.is_empty() {
            index += 1;
            continue;
        }
        let num_atoms: usize = header.parse().map_err(|_| {
            StructureError::Parse(format!(
                "Expected atom count on line {} of {}, found '{}'",
                index + 1,
                path.display(),
                header
            ))
        })?;
        let first = index + 2;
        let end = first + num_atoms;
        if end > lines.len() {
            return Err(StructureError::Parse(format!(
                "Frame at line {} of {} declares {} atoms but the file ends early",
                index + 1,
                path.display(),
                num_atoms
            )));
        }
        frames.push(lines[first..end].iter().map(|line| line.trim_end().to_string()).collect());
        index = end;
    }
    Ok(frames)
}

/// Reads the last structure of a file, dispatching on its extension.
pub fn read_single_file(path: &Path) -> Result<StructureData> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xyz" => {
            let structure = read_xyz(path)?.pop().ok_or_else(|| {
                StructureError::Parse(format!("No structure in {}", path.display()))
            })?;
            Ok(StructureData {
                charge: 0,
                multiplicity: 1,
                structure,
            })
        }
        "log" | "out" => read_gaussian_log(path),
        _ => read_gaussian_input(path),
    }
}

fn parse_int<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| StructureError::Parse(format!("Invalid {}: '{}'", what, text.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const LOG_TAIL: &str = " Charge =  0 Multiplicity = 1\n\
        \u{20}                         Input orientation:\n\
        \u{20}---------------------------------------------------------------------\n\
        \u{20}Center     Atomic      Atomic             Coordinates (Angstroms)\n\
        \u{20}Number     Number       Type             X           Y           Z\n\
        \u{20}---------------------------------------------------------------------\n\
        \u{20}     1          8           0        0.000000    0.000000    0.117300\n\
        \u{20}     2          1           0        0.000000    0.757200   -0.469200\n\
        \u{20}---------------------------------------------------------------------\n";

    #[test]
    fn test_gaussian_log_last_orientation() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            " Charge =  1 Multiplicity = 2\n Standard orientation:\n{}",
            LOG_TAIL
        );
        let path = write(&dir, "water.log", &content);

        let data = read_single_file(&path).unwrap();
        assert_eq!((data.charge, data.multiplicity), (0, 1));
        assert_eq!(data.structure.len(), 2);
        assert_eq!(
            data.structure[0],
            format!("{:<10} {:>12} {:>12} {:>12}", "O", "0.000000", "0.000000", "0.117300")
        );
        assert!(data.structure[1].starts_with("H          "));
    }

    #[test]
    fn test_gaussian_log_without_geometry() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "failed.out", " Charge =  0 Multiplicity = 1\n");
        assert!(matches!(read_single_file(&path), Err(StructureError::Parse(_))));
    }

    #[test]
    fn test_gaussian_input_sections() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "water.gjf",
            "%chk=water.chk\n\
             ! comment before route\n\
             #P B3LYP/def2SVP\n\
             Opt\n\
             \n\
             \n\
             water\n\
             \n\
             -1 2\n\
             \u{20}  O  0.0 0.0 0.0\n\
             LP 0.0 0.0 0.5\n\
             H  0.0 0.0 1.0  \n\
             \n\
             B 1 2 F\n",
        );
        let data = read_gaussian_input(&path).unwrap();
        assert_eq!(data.charge, -1);
        assert_eq!(data.multiplicity, 2);
        assert_eq!(data.structure, vec!["O  0.0 0.0 0.0", "H  0.0 0.0 1.0"]);
    }

    #[test]
    fn test_gaussian_input_without_molecule() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.gjf", "#P SP\n\ntitle\n");
        assert!(matches!(read_gaussian_input(&path), Err(StructureError::Parse(_))));

        let path = write(&dir, "bad.gjf", "#P SP\n\ntitle\n\nzero one\nH 0 0 0\n");
        assert!(matches!(read_gaussian_input(&path), Err(StructureError::Parse(_))));
    }

    #[test]
    fn test_xyz_last_frame() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "traj.xyz",
            "2\nframe 1\nH 0 0 0\nH 0 0 0.7\n\n2\nframe 2\nH 0 0 0\nH 0 0 0.74\n",
        );
        assert_eq!(read_xyz(&path).unwrap().len(), 2);

        let data = read_single_file(&path).unwrap();
        assert_eq!((data.charge, data.multiplicity), (0, 1));
        assert_eq!(data.structure, vec!["H 0 0 0", "H 0 0 0.74"]);
    }

    #[test]
    fn test_xyz_truncated_frame() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "short.xyz", "3\ncomment\nH 0 0 0\n");
        assert!(matches!(read_xyz(&path), Err(StructureError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = read_single_file(Path::new("/nonexistent/structure.log"));
        assert!(matches!(result, Err(StructureError::Io(_))));
    }
}
