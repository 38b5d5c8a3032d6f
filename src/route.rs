//! Route-line composition for one deck phase.
//!
//! The route line is built as an ordered list of terms:
//!
//! 1. print level (`#P`)
//! 2. job term(s) and their options (`Opt=(...)`, `FREQ=noraman`, `IRC=(...)`, ...)
//! 3. method and basis (`UB3LYP Gen Pseudo=read`)
//! 4. solvation (`SCRF=(SMD,solvent=Water)`)
//! 5. dispersion keyword (`empiricaldispersion=GD3BJ`)
//! 6. `nosymm`
//! 7. checkpoint reuse (`guess=read geom=allcheck`) or `guess=mix`
//! 8. fixed default keywords
//! 9. dispersion coefficient override (`iOp(...)`)
//!
//! Blank terms are dropped, and the rest are wrapped at 80 columns without ever
//! breaking inside a term.

use crate::classifier::AtomSet;
use crate::config::{
    DispersionScheme, IrcAlgorithm, IrcDirection, JobConfiguration, JobOptions, JobType,
    OptAlgorithm, OptConvergence, Solvation,
};
use crate::gen_basis::GenBasis;
use std::fmt;
use thiserror::Error;

/// Print-level marker opening every route line.
pub const PRINT_LEVEL: &str = "#P";

/// Soft column limit of a route line.
pub const ROUTE_LINE_LIMIT: usize = 80;

const FREQUENCY_TERM: &str = "FREQ=noraman";

/// Error type for route composition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A stability check was requested for a phase outside the single-point family
    #[error("stable=opt and {job_type} are not compatible")]
    Incompatible {
        /// Job of the offending phase
        job_type: PhaseJob,
    },
}

type Result<T> = std::result::Result<T, RouteError>;

/// Job performed by one phase of a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseJob {
    /// Single point energy
    SinglePoint,
    /// Single point writing a wavefunction file
    WavefunctionExport,
    /// Single point with NBO analysis
    NaturalBondOrbital,
    /// Single point with free-form keywords
    FreeForm,
    /// Frequencies only
    Frequency,
    /// Geometry optimization, optionally followed by frequencies
    Optimization {
        /// Append `FREQ=noraman`
        frequency: bool,
    },
    /// Transition-state search, optionally followed by frequencies
    TransitionState {
        /// Append `FREQ=noraman`
        frequency: bool,
    },
    /// Reaction path following
    ReactionPath,
}

impl PhaseJob {
    /// Phase job performing the whole of `job_type` in one step.
    pub fn from_job_type(job_type: JobType) -> Self {
        match job_type {
            JobType::SinglePoint => PhaseJob::SinglePoint,
            JobType::WavefunctionExport => PhaseJob::WavefunctionExport,
            JobType::NaturalBondOrbital => PhaseJob::NaturalBondOrbital,
            JobType::FreeForm => PhaseJob::FreeForm,
            JobType::Frequency => PhaseJob::Frequency,
            JobType::Optimization => PhaseJob::Optimization { frequency: false },
            JobType::OptimizationFrequency => PhaseJob::Optimization { frequency: true },
            JobType::TransitionState => PhaseJob::TransitionState { frequency: true },
            JobType::ReactionPath => PhaseJob::ReactionPath,
        }
    }

    /// Phases that may carry `stable=opt` in place of `SP`.
    pub fn is_single_point_family(self) -> bool {
        matches!(
            self,
            PhaseJob::SinglePoint
                | PhaseJob::WavefunctionExport
                | PhaseJob::NaturalBondOrbital
                | PhaseJob::FreeForm
        )
    }

    /// Phases followed by the coordinate-constraint block.
    pub fn takes_constraints(self) -> bool {
        matches!(self, PhaseJob::Optimization { .. })
    }
}

impl fmt::Display for PhaseJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseJob::SinglePoint => "SP",
            PhaseJob::WavefunctionExport => "WFX",
            PhaseJob::NaturalBondOrbital => "NBO",
            PhaseJob::FreeForm => "ANY",
            PhaseJob::Frequency => "FREQ",
            PhaseJob::Optimization { frequency: false } => "OPT",
            PhaseJob::Optimization { frequency: true } => "OPT+FREQ",
            PhaseJob::TransitionState { .. } => "TS",
            PhaseJob::ReactionPath => "IRC",
        };
        f.write_str(name)
    }
}

/// One computation step of a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    /// Job performed
    pub job: PhaseJob,
    /// Continues from the checkpoint of an earlier phase
    pub read_prev: bool,
    /// Performs a wavefunction stability check
    pub stableopt: bool,
}

impl Phase {
    /// A fresh phase that reads nothing from earlier phases.
    pub fn new(job: PhaseJob) -> Self {
        Self {
            job,
            read_prev: false,
            stableopt: false,
        }
    }

    /// Marks the phase as continuing from an earlier one.
    pub fn continuing(mut self) -> Self {
        self.read_prev = true;
        self
    }

    /// Marks the phase as a stability check.
    pub fn stability_check(mut self) -> Self {
        self.stableopt = true;
        self
    }
}

/// Builds route lines for the phases of one deck.
///
/// Everything that does not vary between phases (Gen decision, dispersion
/// override, default keywords) is fixed at construction.
#[derive(Debug, Clone)]
pub struct RouteComposer<'a> {
    options: &'a JobOptions,
    open_shell: bool,
    light_atoms_present: bool,
    gen: Option<&'a GenBasis>,
    default_keywords: &'a str,
    dispersion_override: Option<String>,
}

impl<'a> RouteComposer<'a> {
    /// Creates a composer for one job.
    pub fn new(
        config: &'a JobConfiguration,
        atoms: &AtomSet,
        gen: Option<&'a GenBasis>,
        default_keywords: &'a str,
    ) -> Self {
        Self {
            options: &config.options,
            open_shell: config.is_open_shell(),
            light_atoms_present: !atoms.light.is_empty(),
            gen,
            default_keywords,
            dispersion_override: None,
        }
    }

    /// Sets the `iOp(...)` directive appended to every route line.
    pub fn with_dispersion_override(mut self, directive: String) -> Self {
        self.dispersion_override = Some(directive);
        self
    }

    /// Composes the route line of `phase`, wrapped and without a trailing newline.
    ///
    /// # Errors
    ///
    /// [`RouteError::Incompatible`] when a stability check is requested for a
    /// phase outside the single-point family.
    pub fn compose(&self, phase: &Phase) -> Result<String> {
        let options = self.options;
        let mut terms = vec![PRINT_LEVEL.to_string()];

        terms.extend(self.job_terms(phase)?);
        terms.push(self.method_term(phase));
        if let Some(term) = self.solvation_term() {
            terms.push(term);
        }
        if options.dispersion != DispersionScheme::None {
            terms.push(format!("empiricaldispersion={}", options.dispersion));
        }
        if options.nosymm {
            terms.push("nosymm".to_string());
        }
        if phase.read_prev {
            terms.push("guess=read".to_string());
            terms.push("geom=allcheck".to_string());
        } else if options.guess_mix {
            terms.push("guess=mix".to_string());
        }
        terms.push(self.default_keywords.to_string());
        if let Some(directive) = &self.dispersion_override {
            terms.push(directive.clone());
        }

        terms.retain(|term| !term.trim().is_empty());
        Ok(join_terms(&terms, ROUTE_LINE_LIMIT))
    }

    fn job_terms(&self, phase: &Phase) -> Result<Vec<String>> {
        let options = self.options;
        let mut terms = Vec::new();

        if phase.job.is_single_point_family() {
            terms.push(if phase.stableopt { "stable=opt" } else { "SP" }.to_string());
        } else if phase.stableopt {
            return Err(RouteError::Incompatible {
                job_type: phase.job,
            });
        }

        let frequency_term = || {
            // calcall already yields frequencies
            (options.opt_calcfc != Some(1)).then(|| FREQUENCY_TERM.to_string())
        };

        match phase.job {
            PhaseJob::SinglePoint => {}
            PhaseJob::WavefunctionExport => terms.push("output=wfx".to_string()),
            PhaseJob::NaturalBondOrbital => terms.push(self.nbo_term()),
            PhaseJob::FreeForm => terms.push(options.any_job_input.trim().to_string()),
            PhaseJob::Frequency => terms.push(FREQUENCY_TERM.to_string()),
            PhaseJob::Optimization { frequency } => {
                terms.push(self.opt_term());
                if frequency {
                    terms.extend(frequency_term());
                }
            }
            PhaseJob::TransitionState { frequency } => {
                terms.push(self.ts_term());
                if frequency {
                    terms.extend(frequency_term());
                }
            }
            PhaseJob::ReactionPath => terms.push(self.irc_term()),
        }
        Ok(terms)
    }

    /// Method and basis, e.g. `UB3LYP Gen Pseudo=read` or `B3LYP def2SVP`.
    fn method_term(&self, phase: &Phase) -> String {
        let unrestricted = self.open_shell
            || phase.stableopt
            || (phase.read_prev && self.options.first_stable_check);
        let prefix = if unrestricted { "U" } else { "" };

        let mut parts = vec![format!("{}{}", prefix, self.options.method)];
        match self.gen {
            Some(gen) => {
                parts.push("Gen".to_string());
                if gen.pseudo_read() {
                    parts.push("Pseudo=read".to_string());
                }
            }
            None if self.light_atoms_present => parts.push(self.options.basis.clone()),
            None => parts.push(self.options.basis_h_ecp.clone()),
        }
        parts.join(" ")
    }

    fn solvation_term(&self) -> Option<String> {
        match self.options.solvation {
            Solvation::None => None,
            model => Some(format!(
                "SCRF=({},solvent={})",
                model, self.options.solvent
            )),
        }
    }

    fn nbo_term(&self) -> String {
        let program = self.options.nbo_version.program();
        if self.options.nbo_save {
            format!("pop=({}read,savenbos)", program)
        } else {
            format!("pop={}read", program)
        }
    }

    /// Convergence, cycle and step options shared by minimum and TS searches.
    fn common_opt_options(&self) -> Vec<String> {
        let options = self.options;
        let mut opt_options = Vec::new();
        if options.opt_convergence != OptConvergence::Default {
            opt_options.push(options.opt_convergence.to_string());
        }
        if let Some(maxcycle) = options.opt_maxcycle {
            opt_options.push(format!("maxcycle={}", maxcycle));
        }
        if let Some(maxstep) = options.opt_maxstep {
            opt_options.push(format!("maxstep={}", maxstep));
        }
        opt_options
    }

    fn opt_term(&self) -> String {
        let options = self.options;
        let mut opt_options = self.common_opt_options();
        match options.opt_calcfc {
            None => {}
            Some(0) => opt_options.push("calcfc".to_string()),
            Some(1) => opt_options.push("calcall".to_string()),
            Some(n) => {
                opt_options.push("calcfc".to_string());
                opt_options.push(format!("recalcfc={}", n));
            }
        }
        if options.opt_algorithm != OptAlgorithm::Default {
            opt_options.push(options.opt_algorithm.to_string());
        }
        if options.modredundant_block().is_some() {
            opt_options.push("modredundant".to_string());
        }
        option_term("Opt", &opt_options)
    }

    fn ts_term(&self) -> String {
        let options = self.options;
        let mut opt_options = vec!["TS".to_string(), "noeigentest".to_string()];
        opt_options.extend(self.common_opt_options());
        match options.opt_calcfc {
            None | Some(0) => opt_options.push("calcfc".to_string()),
            Some(1) => opt_options.push("calcall".to_string()),
            Some(n) => {
                opt_options.push("calcfc".to_string());
                opt_options.push(format!("recalcfc={}", n));
            }
        }
        if options.opt_algorithm != OptAlgorithm::Default {
            opt_options.push(options.opt_algorithm.to_string());
        }
        option_term("Opt", &opt_options)
    }

    fn irc_term(&self) -> String {
        let options = self.options;
        let lqa = options.irc_algorithm == IrcAlgorithm::Lqa;

        let mut irc_options = vec![options.irc_algorithm.to_string()];
        if lqa {
            irc_options.push("recorrect=never".to_string());
        }
        if options.irc_direction != IrcDirection::Both {
            irc_options.push(options.irc_direction.to_string());
        }
        if let Some(maxpoints) = options.irc_maxpoints {
            irc_options.push(format!("maxpoints={}", maxpoints));
        }
        if let Some(stepsize) = options.irc_stepsize {
            irc_options.push(format!("stepsize={}", stepsize));
        }
        if let (Some(maxcyc), false) = (options.irc_maxcyc, lqa) {
            irc_options.push(format!("maxcyc={}", maxcyc));
        }
        irc_options.push("calcfc".to_string());

        // LQA has no corrector step
        let schedule = match (options.irc_calcfc_predictor, options.irc_calcfc_corrector, lqa) {
            (Some(predictor), _, true) => Some(format!("recalc={}", predictor)),
            (None, _, true) => None,
            (Some(predictor), None, false) => Some(format!("recalc={}", predictor)),
            (None, Some(corrector), false) => Some(format!("recalc=-{}", corrector)),
            (Some(predictor), Some(corrector), false) => Some(format!(
                "recalcfc=(predictor={}, corrector={})",
                predictor, corrector
            )),
            (None, None, false) => None,
        };
        irc_options.extend(schedule);

        option_term("IRC", &irc_options)
    }
}

/// Renders `name`, `name=X` or `name=(a,b,...)`.
fn option_term(name: &str, options: &[String]) -> String {
    match options {
        [] => name.to_string(),
        [single] if !single.contains('=') && !single.contains(',') => {
            format!("{}={}", name, single)
        }
        _ => format!("{}=({})", name, options.join(",")),
    }
}

/// Joins terms with single spaces, starting a new line whenever the next term
/// would push the line past `limit` columns.
///
/// A term is never split; a single term longer than `limit` gets a line of its
/// own.
///
/// # Examples
///
/// ```
/// use gauprep::route::join_terms;
///
/// assert_eq!(join_terms(&["#P", "SP", "B3LYP def2SVP"], 80), "#P SP B3LYP def2SVP");
/// assert_eq!(join_terms(&["aaaa", "bbbb", "cc"], 9), "aaaa bbbb\ncc");
/// ```
pub fn join_terms<S: AsRef<str>>(terms: &[S], limit: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for term in terms {
        let term = term.as_ref();
        if current.is_empty() {
            current.push_str(term);
        } else if current.len() + 1 + term.len() <= limit {
            current.push(' ');
            current.push_str(term);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(term);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}
