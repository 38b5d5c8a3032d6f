//! Saved job options.
//!
//! A preset is a [`JobOptions`] value stored as pretty-printed JSON so that a
//! set of calculation settings can be reused across structures. Keys missing
//! from the file take their default values, and the same typed invariants that
//! [`JobOptions::set`] enforces apply on load (counts must be non-zero, keyword
//! enums must name a known variant).
//!
//! ```no_run
//! use gauprep::config::JobOptions;
//! use gauprep::presets;
//! use std::path::Path;
//!
//! let mut options = JobOptions::default();
//! options.set("job_type", "opt+freq")?;
//! presets::save(&options, Path::new("opt_freq.json"))?;
//!
//! let restored = presets::load(Path::new("opt_freq.json"))?;
//! assert_eq!(restored, options);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::JobOptions;
use log::info;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for preset files.
#[derive(Error, Debug)]
pub enum PresetError {
    /// I/O error when reading or writing the preset
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The preset is not valid JSON for job options
    #[error("Invalid preset {path}: {source}")]
    Json {
        /// Preset file
        path: String,
        /// Underlying decoder error
        source: serde_json::Error,
    },
}

type Result<T> = std::result::Result<T, PresetError>;

/// Writes `options` to `path` as pretty JSON.
pub fn save(options: &JobOptions, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(options).map_err(|source| PresetError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, json)?;
    info!("Preset saved to {}", path.display());
    Ok(())
}

/// Reads job options from a preset file.
pub fn load(path: &Path) -> Result<JobOptions> {
    let content = fs::read_to_string(path)?;
    let options = serde_json::from_str(&content).map_err(|source| PresetError::Json {
        path: path.display().to_string(),
        source,
    })?;
    info!("Preset loaded from {}", path.display());
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JobType, Solvation};
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_preserves_assignments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ts.json");

        let mut options = JobOptions::default();
        options.set("job_type", "ts").unwrap();
        options.set("solvation", "smd").unwrap();
        options.set("solvent", "water").unwrap();
        save(&options, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.job_type, JobType::TransitionState);
        assert_eq!(loaded.solvation, Solvation::Smd);
        assert_eq!(loaded, options);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, "{}").unwrap();

        assert_eq!(load(&path).unwrap(), JobOptions::default());
    }

    #[test]
    fn test_invalid_preset_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"job_type\": \"dance\"}").unwrap();

        assert!(matches!(load(&path), Err(PresetError::Json { .. })));
        assert!(matches!(
            load(&dir.path().join("absent.json")),
            Err(PresetError::Io(_))
        ));
    }
}
