//! Job configuration: charge, multiplicity, structure and named options.
//!
//! This module defines the data a deck is composed from:
//!
//! - [`JobConfiguration`]: charge, multiplicity, structure lines and options
//! - [`JobOptions`]: all named options (job type, method, basis sets, ...)
//! - keyword enums such as [`JobType`], [`Solvation`] and [`DispersionScheme`]
//!
//! Every option is stored in a typed field, so an invalid value can never reach
//! the composer. Counts that must be positive are `NonZeroU32`; unset counts
//! are `None`. String input (presets, command-line overrides) goes through
//! [`JobOptions::set`], which validates the value at the point of assignment
//! and reports a [`ValidationError`] naming the field.
//!
//! # Examples
//!
//! ```
//! use gauprep::config::{JobConfiguration, JobType};
//!
//! let mut job = JobConfiguration::new(0, 1, vec!["H 0.0 0.0 0.0".into(), "H 0.0 0.0 0.74".into()])?;
//! job.options.set("job_type", "opt+freq")?;
//! job.options.set("opt_maxcycle", "200")?;
//! assert_eq!(job.options.job_type, JobType::OptimizationFrequency);
//! assert!(job.options.set("opt_maxcycle", "-1").is_err());
//! # Ok::<(), gauprep::config::ValidationError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use thiserror::Error;

/// Error raised when a configuration value fails its type or range constraint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A value could not be converted to the field's type
    #[error("Invalid value '{value}' for {field}: expected {expected}")]
    InvalidValue {
        /// Option name
        field: &'static str,
        /// Description of accepted values
        expected: &'static str,
        /// Rejected input
        value: String,
    },
    /// The option name is not known
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    /// Multiplicity below 1
    #[error("Multiplicity should be a positive integer, got {0}")]
    InvalidMultiplicity(i64),
    /// No atom lines were given
    #[error("Structure contains no atom lines")]
    EmptyStructure,
}

/// Declares a keyword enum parsed case-insensitively from its keyword or aliases.
///
/// Each variant renders as its keyword; serde goes through the same string form.
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($field:literal) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $keyword:literal $(| $alias:literal)*
            ),+ $(,)?
        }
        default = $default:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Keyword written for this value.
            pub fn keyword(self) -> &'static str {
                match self {
                    $($name::$variant => $keyword,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.keyword())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim();
                $(
                    if value.eq_ignore_ascii_case($keyword)
                        $(|| value.eq_ignore_ascii_case($alias))*
                    {
                        return Ok($name::$variant);
                    }
                )+
                Err(ValidationError::InvalidValue {
                    field: $field,
                    expected: concat!("one of", $(" '", $keyword, "'"),+),
                    value: value.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.keyword().to_string()
            }
        }
    };
}

keyword_enum! {
    /// Kind of calculation requested for a deck.
    pub enum JobType ("job_type") {
        /// Single point energy
        SinglePoint => "SP",
        /// Harmonic frequencies
        Frequency => "FREQ",
        /// Geometry optimization
        Optimization => "OPT",
        /// Geometry optimization followed by frequencies
        OptimizationFrequency => "OPT+FREQ" | "OPTFREQ",
        /// Transition-state search (with frequencies)
        TransitionState => "TS",
        /// Intrinsic reaction coordinate
        ReactionPath => "IRC",
        /// Single point writing a `.wfx` wavefunction file
        WavefunctionExport => "WFX",
        /// Single point with NBO analysis
        NaturalBondOrbital => "NBO",
        /// Single point with free-form job keywords
        FreeForm => "ANY",
    }
    default = OptimizationFrequency;
}

impl JobType {
    /// Job types that always produce a single, self-contained phase.
    pub fn is_single_point_family(self) -> bool {
        matches!(
            self,
            JobType::SinglePoint
                | JobType::WavefunctionExport
                | JobType::NaturalBondOrbital
                | JobType::FreeForm
        )
    }
}

keyword_enum! {
    /// Implicit solvation model.
    pub enum Solvation ("solvation") {
        /// Gas phase
        None => "none" | "",
        /// Polarizable continuum model
        Pcm => "PCM",
        /// Conductor-like PCM
        Cpcm => "CPCM",
        /// Solvation model based on density
        Smd => "SMD",
    }
    default = None;
}

keyword_enum! {
    /// Empirical dispersion correction.
    ///
    /// Schemes group into families, see
    /// [`DispersionFamily`](crate::dispersion::DispersionFamily).
    pub enum DispersionScheme ("dispersion") {
        /// No dispersion correction
        None => "none" | "",
        /// D3 with zero damping
        D3Zero => "GD3" | "GD3ZERO" | "D3" | "D3ZERO",
        /// D3 with Becke-Johnson damping
        D3BeckeJohnson => "GD3BJ" | "D3BJ",
        /// Legacy D2
        D2 => "GD2" | "D2",
    }
    default = None;
}

keyword_enum! {
    /// Optimization convergence criteria.
    pub enum OptConvergence ("opt_convergence") {
        /// Program default
        Default => "default" | "",
        /// Loose criteria
        Loose => "loose",
        /// Tight criteria
        Tight => "tight",
        /// Very tight criteria
        VeryTight => "verytight",
    }
    default = Default;
}

keyword_enum! {
    /// Optimization algorithm override.
    pub enum OptAlgorithm ("opt_algorithm") {
        /// Program default
        Default => "default" | "",
        /// Geometry DIIS
        Gdiis => "GDIIS",
        /// Newton-Raphson
        Newton => "Newton",
    }
    default = Default;
}

keyword_enum! {
    /// Direction followed along the reaction path.
    pub enum IrcDirection ("irc_direction") {
        /// Both directions
        Both => "both" | "",
        /// Forward only
        Forward => "forward",
        /// Reverse only
        Reverse => "reverse",
    }
    default = Both;
}

keyword_enum! {
    /// Reaction path integrator.
    pub enum IrcAlgorithm ("irc_algorithm") {
        /// Local quadratic approximation
        Lqa => "LQA",
        /// Hessian-based predictor-corrector
        Hpc => "HPC",
        /// Euler predictor-corrector
        EulerPc => "EulerPC",
    }
    default = Lqa;
}

keyword_enum! {
    /// NBO program invoked for population analysis.
    pub enum NboVersion ("nbo_version") {
        /// NBO bundled with Gaussian
        Gaussian => "Gaussian" | "nbo",
        /// External NBO 6
        Nbo6 => "6" | "nbo6",
        /// External NBO 7
        Nbo7 => "7" | "nbo7",
    }
    default = Gaussian;
}

impl NboVersion {
    /// Program name used in `pop=` keywords.
    pub fn program(self) -> &'static str {
        match self {
            NboVersion::Gaussian => "nbo",
            NboVersion::Nbo6 => "nbo6",
            NboVersion::Nbo7 => "nbo7",
        }
    }
}

/// Named options of a job, independent of the molecule.
///
/// Defaults follow common practice for routine DFT work: an optimization plus
/// frequency job with B3LYP/def2SVP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    /// Processor count (`%nprocshared`)
    pub n_proc: Option<NonZeroU32>,
    /// Memory (`%mem`), free text such as `16GB`
    pub memory: String,
    /// Title line; supports `${GEN}` and `${FILENAME}` placeholders
    pub title: String,
    /// Kind of calculation
    pub job_type: JobType,
    /// Functional or wavefunction method
    pub method: String,
    /// Basis set for light atoms
    pub basis: String,
    /// Basis set (with ECP) for heavy atoms
    pub basis_h_ecp: String,
    /// Apply the ECP basis set from the 3d-metal row (K) instead of Rb
    pub ecp_for_3d: bool,
    /// Solvation model
    pub solvation: Solvation,
    /// Solvent name
    pub solvent: String,
    /// Dispersion correction
    pub dispersion: DispersionScheme,
    /// Override the engine's dispersion coefficients with tabulated values
    pub dispersion_external_param: bool,
    /// Suppress symmetry and reorientation
    pub nosymm: bool,
    /// Optimization convergence criteria
    pub opt_convergence: OptConvergence,
    /// Maximum optimization cycles
    pub opt_maxcycle: Option<NonZeroU32>,
    /// Maximum optimization step
    pub opt_maxstep: Option<NonZeroU32>,
    /// Force constants: 0 = calcfc, 1 = calcall, N > 1 = recalcfc every N steps
    pub opt_calcfc: Option<u32>,
    /// Optimization algorithm
    pub opt_algorithm: OptAlgorithm,
    /// Coordinate constraints (ModRedundant input)
    pub opt_modredundant: String,
    /// IRC direction
    pub irc_direction: IrcDirection,
    /// IRC integrator
    pub irc_algorithm: IrcAlgorithm,
    /// Maximum points along each direction
    pub irc_maxpoints: Option<NonZeroU32>,
    /// Step size in units of 0.01 Bohr
    pub irc_stepsize: Option<NonZeroU32>,
    /// Maximum optimization cycles per IRC point
    pub irc_maxcyc: Option<NonZeroU32>,
    /// Recompute force constants every N predictor steps
    pub irc_calcfc_predictor: Option<NonZeroU32>,
    /// Recompute force constants every N corrector steps
    pub irc_calcfc_corrector: Option<NonZeroU32>,
    /// NBO program
    pub nbo_version: NboVersion,
    /// Keywords for the `$NBO ... $END` block
    pub nbo_keywords: Vec<String>,
    /// Store NBOs in the checkpoint file
    pub nbo_save: bool,
    /// Route keywords for free-form jobs
    pub any_job_input: String,
    /// Run a stability check (stable=opt) before the job
    pub first_stable_check: bool,
    /// Mix HOMO and LUMO in the initial guess
    pub guess_mix: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            n_proc: None,
            memory: String::new(),
            title: String::new(),
            job_type: JobType::default(),
            method: "B3LYP".to_string(),
            basis: "def2SVP".to_string(),
            basis_h_ecp: "def2SVP".to_string(),
            ecp_for_3d: false,
            solvation: Solvation::default(),
            solvent: "Chloroform".to_string(),
            dispersion: DispersionScheme::default(),
            dispersion_external_param: false,
            nosymm: false,
            opt_convergence: OptConvergence::default(),
            opt_maxcycle: None,
            opt_maxstep: None,
            opt_calcfc: None,
            opt_algorithm: OptAlgorithm::default(),
            opt_modredundant: String::new(),
            irc_direction: IrcDirection::default(),
            irc_algorithm: IrcAlgorithm::default(),
            irc_maxpoints: None,
            irc_stepsize: None,
            irc_maxcyc: None,
            irc_calcfc_predictor: None,
            irc_calcfc_corrector: None,
            nbo_version: NboVersion::default(),
            nbo_keywords: Vec::new(),
            nbo_save: false,
            any_job_input: String::new(),
            first_stable_check: false,
            guess_mix: false,
        }
    }
}

impl JobOptions {
    /// Assigns one option from its string form.
    ///
    /// Keys are the field names of [`JobOptions`] (case-insensitive). Empty
    /// strings unset optional counts. Boolean options accept
    /// `true/false`, `yes/no`, `on/off` and `1/0`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::UnknownOption`] for an unknown key
    /// - [`ValidationError::InvalidValue`] when the value fails the field's
    ///   constraint; the option keeps its previous value
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ValidationError> {
        let key = key.trim().to_ascii_lowercase();
        match key.as_str() {
            "n_proc" | "nproc" => self.n_proc = parse_count("n_proc", value)?,
            "memory" | "mem" => self.memory = value.trim().to_string(),
            "title" => self.title = value.trim().to_string(),
            "job_type" => self.job_type = value.parse()?,
            "method" => self.method = value.trim().to_string(),
            "basis" => self.basis = value.trim().to_string(),
            "basis_h_ecp" => self.basis_h_ecp = value.trim().to_string(),
            "ecp_for_3d" => self.ecp_for_3d = parse_flag("ecp_for_3d", value)?,
            "solvation" => self.solvation = value.parse()?,
            "solvent" => self.solvent = value.trim().to_string(),
            "dispersion" => self.dispersion = value.parse()?,
            "dispersion_external_param" => {
                self.dispersion_external_param = parse_flag("dispersion_external_param", value)?
            }
            "nosymm" => self.nosymm = parse_flag("nosymm", value)?,
            "opt_convergence" => self.opt_convergence = value.parse()?,
            "opt_maxcycle" => self.opt_maxcycle = parse_count("opt_maxcycle", value)?,
            "opt_maxstep" => self.opt_maxstep = parse_count("opt_maxstep", value)?,
            "opt_calcfc" => self.opt_calcfc = parse_non_negative("opt_calcfc", value)?,
            "opt_algorithm" => self.opt_algorithm = value.parse()?,
            "opt_modredundant" => self.opt_modredundant = value.to_string(),
            "irc_direction" => self.irc_direction = value.parse()?,
            "irc_algorithm" => self.irc_algorithm = value.parse()?,
            "irc_maxpoints" => self.irc_maxpoints = parse_count("irc_maxpoints", value)?,
            "irc_stepsize" => self.irc_stepsize = parse_count("irc_stepsize", value)?,
            "irc_maxcyc" => self.irc_maxcyc = parse_count("irc_maxcyc", value)?,
            "irc_calcfc_predictor" => {
                self.irc_calcfc_predictor = parse_count("irc_calcfc_predictor", value)?
            }
            "irc_calcfc_corrector" => {
                self.irc_calcfc_corrector = parse_count("irc_calcfc_corrector", value)?
            }
            "nbo_version" => self.nbo_version = value.parse()?,
            "nbo_keywords" => {
                self.nbo_keywords = value.split_whitespace().map(str::to_string).collect()
            }
            "nbo_save" => self.nbo_save = parse_flag("nbo_save", value)?,
            "any_job_input" => self.any_job_input = value.trim().to_string(),
            "first_stable_check" => {
                self.first_stable_check = parse_flag("first_stable_check", value)?
            }
            "guess_mix" => self.guess_mix = parse_flag("guess_mix", value)?,
            _ => return Err(ValidationError::UnknownOption(key)),
        }
        Ok(())
    }

    /// Constraint block with surrounding whitespace removed from every line and
    /// blank lines dropped; `None` when nothing remains.
    pub fn modredundant_block(&self) -> Option<String> {
        let lines: Vec<&str> = self
            .opt_modredundant
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n") + "\n")
        }
    }

    /// True when dispersion coefficients are written as IOp overrides.
    pub fn uses_external_dispersion(&self) -> bool {
        self.dispersion != DispersionScheme::None && self.dispersion_external_param
    }
}

/// Parses an optional positive count; blank input means unset.
fn parse_count(field: &'static str, value: &str) -> Result<Option<NonZeroU32>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<NonZeroU32>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidValue {
            field,
            expected: "a positive integer",
            value: value.to_string(),
        })
}

/// Parses an optional non-negative integer; blank input means unset.
fn parse_non_negative(field: &'static str, value: &str) -> Result<Option<u32>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidValue {
            field,
            expected: "0 (calcfc), 1 (calcall) or a positive integer (recalcfc)",
            value: value.to_string(),
        })
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" | "" => Ok(false),
        other => Err(ValidationError::InvalidValue {
            field,
            expected: "true or false",
            value: other.to_string(),
        }),
    }
}

/// A validated molecule plus the options of the job to run on it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfiguration {
    /// Total charge
    pub charge: i32,
    /// Spin multiplicity (2S+1)
    pub multiplicity: NonZeroU32,
    structure: Vec<String>,
    /// Named options
    pub options: JobOptions,
}

impl JobConfiguration {
    /// Creates a configuration with default options.
    ///
    /// Line terminators are stripped from the structure lines and trailing
    /// whitespace is removed from the last line.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidMultiplicity`] when `multiplicity < 1`
    /// - [`ValidationError::EmptyStructure`] when no non-blank line is given
    pub fn new(charge: i32, multiplicity: i64, structure: Vec<String>) -> Result<Self, ValidationError> {
        let multiplicity = u32::try_from(multiplicity)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or(ValidationError::InvalidMultiplicity(multiplicity))?;

        let mut structure: Vec<String> = structure
            .into_iter()
            .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
            .collect();
        while structure.last().map_or(false, |line| line.trim().is_empty()) {
            structure.pop();
        }
        match structure.last_mut() {
            Some(last) => *last = last.trim_end().to_string(),
            None => return Err(ValidationError::EmptyStructure),
        }

        Ok(Self {
            charge,
            multiplicity,
            structure,
            options: JobOptions::default(),
        })
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// Atom lines, without line terminators.
    pub fn structure(&self) -> &[String] {
        &self.structure
    }

    /// True for any multiplicity other than singlet.
    pub fn is_open_shell(&self) -> bool {
        self.multiplicity.get() != 1
    }
}
