#![deny(missing_docs)]

//! gauprep - Gaussian input deck composer
//!
//! gauprep turns a molecule (charge, multiplicity, atom lines) and a set of
//! named job options into a complete Gaussian input deck: resource lines, a
//! wrapped route line, title, molecule specification and the trailing blocks
//! the job needs (constraints, Gen/ECP basis sets, NBO or WFX requests).
//!
//! # Overview
//!
//! Composition runs in three steps:
//!
//! 1. **Classification**: atoms split into a light set and a heavy set at a
//!    configurable periodic-table row, see [`classifier`]
//! 2. **Basis assembly**: when the two sets need different basis sets, or a
//!    basis comes from an external `.gbs` library, an inline Gen/ECP block is
//!    built, see [`gen_basis`] and [`basis_library`]
//! 3. **Deck rendering**: jobs that Gaussian cannot run in one step (TS and
//!    optimization jobs with frequencies under a custom dispersion override)
//!    are split into linked phases, the later ones reading the previous
//!    geometry and wavefunction from the checkpoint, see [`deck`] and [`route`]
//!
//! # Dispersion Overrides
//!
//! With `dispersion_external_param` set, tabulated D3 coefficients for the
//! chosen functional are encoded as `iOp(3/174=...)` overlays, see
//! [`dispersion`].
//!
//! # Quick Start
//!
//! ```no_run
//! use gauprep::config::JobConfiguration;
//! use gauprep::deck::DeckComposer;
//! use gauprep::settings::SettingsManager;
//! use gauprep::structure_reader::read_single_file;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SettingsManager::load()?;
//!     let data = read_single_file(Path::new("pd_complex.log"))?;
//!
//!     let mut config: JobConfiguration = data.into_configuration()?;
//!     config.options.set("job_type", "TS")?;
//!     config.options.set("basis_h_ecp", "LANL2DZ")?;
//!
//!     DeckComposer::new(settings.settings()).write(&config, Path::new("pd_ts.gjf"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`](config/index.html) - Job options and validated job configuration
//! - [`deck`](deck/index.html) - Phase planning and deck rendering
//! - [`route`](route/index.html) - Route line composition
//! - [`gen_basis`](gen_basis/index.html) - Gen/ECP basis decision and assembly
//! - [`basis_library`](basis_library/index.html) - `.gbs` basis/ECP libraries
//! - [`dispersion`](dispersion/index.html) - D3 parameter tables and IOp encoding
//! - [`structure_reader`](structure_reader/index.html) - Structure input files
//! - [`settings`](settings/index.html) - Site settings
//!
//! # License
//!
//! MIT License - see [LICENSE](../LICENSE) file for details

/// External Gaussian-format basis set libraries
pub mod basis_library;
/// Light/heavy atom classification
pub mod classifier;
pub mod config;
pub mod deck;
pub mod dispersion;
/// Element symbol table
pub mod elements;
pub mod gen_basis;
/// Dynamic file naming based on the deck basename
pub mod naming;
/// Saved job options
pub mod presets;
pub mod route;
/// Configuration management system
pub mod settings;
pub mod structure_reader;

pub use config::{JobConfiguration, JobOptions};
pub use deck::{Deck, DeckComposer};
