//! Deck composition: phase planning and block rendering.
//!
//! A deck is a sequence of blocks, one per phase. The first block carries the
//! title, charge, multiplicity and structure; later blocks start with the link
//! separator and read geometry and wavefunction from the shared checkpoint.
//!
//! Phase planning:
//!
//! - single-point family (SP, WFX, NBO, ANY): one phase, which becomes the
//!   stability check itself when one is requested
//! - any other job: an optional leading stability check, then either one phase
//!   of the requested job, or, for OPT+FREQ and TS with external dispersion
//!   coefficients, an optimization phase followed by a frequency phase
//!
//! Composition is all-or-nothing: [`DeckComposer::write`] renders the whole
//! deck in memory before touching the output file.

use crate::basis_library::BasisLibraryError;
use crate::classifier::{classify, HeavyAtomThreshold};
use crate::config::{JobConfiguration, JobOptions, JobType};
use crate::dispersion::{supported_family, DispersionError, DispersionParameterTable};
use crate::gen_basis::{resolve_gen_basis, BasisChoice, GenBasis};
use crate::naming::FileNaming;
use crate::route::{Phase, PhaseJob, RouteComposer, RouteError};
use crate::settings::{PathSettings, Settings};
use log::{debug, info};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Separator opening every continuing block.
pub const LINK_SEPARATOR: &str = "--Link1--";

/// Title written when none is given.
pub const NO_TITLE: &str = "NO TITLE";

const GEN_PLACEHOLDER: &str = "${GEN}";
const FILENAME_PLACEHOLDER: &str = "${FILENAME}";

/// Error type for deck composition.
#[derive(Error, Debug)]
pub enum DeckError {
    /// Basis library could not be read or lacks an element
    #[error("Basis library error: {0}")]
    Basis(#[from] BasisLibraryError),
    /// Dispersion parameters could not be encoded
    #[error("Dispersion parameter error: {0}")]
    Dispersion(#[from] DispersionError),
    /// Route line could not be composed
    #[error("Route error: {0}")]
    Route(#[from] RouteError),
    /// Output file could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, DeckError>;

/// Plans the phases of a job.
///
/// # Examples
///
/// ```
/// use gauprep::config::{DispersionScheme, JobOptions, JobType};
/// use gauprep::deck::plan_phases;
/// use gauprep::route::PhaseJob;
///
/// let mut options = JobOptions::default();
/// options.job_type = JobType::TransitionState;
/// options.dispersion = DispersionScheme::D3BeckeJohnson;
/// options.dispersion_external_param = true;
///
/// let phases = plan_phases(&options);
/// assert_eq!(phases.len(), 2);
/// assert_eq!(phases[0].job, PhaseJob::TransitionState { frequency: false });
/// assert_eq!(phases[1].job, PhaseJob::Frequency);
/// assert!(phases[1].read_prev);
/// ```
pub fn plan_phases(options: &JobOptions) -> Vec<Phase> {
    let job_type = options.job_type;

    if job_type.is_single_point_family() {
        let phase = Phase::new(PhaseJob::from_job_type(job_type));
        return vec![if options.first_stable_check {
            phase.stability_check()
        } else {
            phase
        }];
    }

    let mut phases = Vec::new();
    if options.first_stable_check {
        phases.push(Phase::new(PhaseJob::SinglePoint).stability_check());
    }

    // D3 overrides are not honored by the frequency step of a combined job
    let split_frequency = options.uses_external_dispersion()
        && matches!(
            job_type,
            JobType::OptimizationFrequency | JobType::TransitionState
        );
    let jobs = if split_frequency {
        let search = match job_type {
            JobType::TransitionState => PhaseJob::TransitionState { frequency: false },
            _ => PhaseJob::Optimization { frequency: false },
        };
        vec![search, PhaseJob::Frequency]
    } else {
        vec![PhaseJob::from_job_type(job_type)]
    };

    for job in jobs {
        let phase = Phase::new(job);
        phases.push(if phases.is_empty() {
            phase
        } else {
            phase.continuing()
        });
    }
    phases
}

/// One rendered phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    phase: Phase,
    text: String,
}

impl Block {
    /// Phase this block performs.
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Block text, ending in exactly one blank line.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A composed deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    blocks: Vec<Block>,
}

impl Deck {
    /// Blocks in execution order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Full deck text.
    pub fn render(&self) -> String {
        self.blocks.iter().map(|block| block.text.as_str()).collect()
    }
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            f.write_str(&block.text)?;
        }
        Ok(())
    }
}

/// Composes decks using site settings (library locations, default keywords).
#[derive(Debug, Clone)]
pub struct DeckComposer {
    paths: PathSettings,
    default_keywords: String,
}

impl Default for DeckComposer {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl DeckComposer {
    /// Creates a composer from loaded settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            paths: settings.paths.clone(),
            default_keywords: settings.route.default_keywords.clone(),
        }
    }

    /// Composes the deck for `config`; file names inside the deck derive from
    /// `naming`.
    ///
    /// The Gen decision and the dispersion override are computed once and
    /// shared by all phases.
    pub fn compose(&self, config: &JobConfiguration, naming: &FileNaming) -> Result<Deck> {
        let options = &config.options;
        let atoms = classify(
            config.structure(),
            HeavyAtomThreshold::from_ecp_for_3d(options.ecp_for_3d),
        );

        let light = BasisChoice::resolve(&options.basis, &self.paths.external_basis_dir);
        let heavy = BasisChoice::resolve(&options.basis_h_ecp, &self.paths.external_basis_dir);
        let gen = resolve_gen_basis(&atoms, &light, &heavy)?;

        let mut route = RouteComposer::new(config, &atoms, gen.as_ref(), &self.default_keywords);
        if options.uses_external_dispersion() {
            route = route.with_dispersion_override(self.dispersion_override(options)?);
        }

        let title = render_title(&options.title, gen.as_ref(), naming);
        let phases = plan_phases(options);
        debug!(
            "Composing {} phase(s) for {} job in {}",
            phases.len(),
            options.job_type,
            naming.basename()
        );

        let blocks = phases
            .into_iter()
            .map(|phase| -> Result<Block> {
                let route_line = route.compose(&phase)?;
                let text = render_block(config, &phase, &route_line, &title, gen.as_ref(), naming);
                Ok(Block { phase, text })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Deck { blocks })
    }

    /// Composes the deck and writes it to `path`.
    ///
    /// Nothing is written when composition fails.
    pub fn write(&self, config: &JobConfiguration, path: &Path) -> Result<Deck> {
        let deck = self.compose(config, &FileNaming::new(path))?;
        fs::write(path, deck.render())?;
        info!(
            "Wrote {} phase(s) to {}",
            deck.blocks().len(),
            path.display()
        );
        Ok(deck)
    }

    fn dispersion_override(&self, options: &JobOptions) -> Result<String> {
        let family = supported_family(options.dispersion)?;
        let path = self
            .paths
            .dispersion_params(family)
            .ok_or(DispersionError::NotSupported {
                scheme: options.dispersion,
            })?;
        let table = DispersionParameterTable::load(options.dispersion, path)?;
        Ok(table.iop_directive(&options.method)?)
    }
}

/// Expands `${GEN}` and `${FILENAME}`; a blank title becomes [`NO_TITLE`].
fn render_title(title: &str, gen: Option<&GenBasis>, naming: &FileNaming) -> String {
    let title = title.trim();
    if title.is_empty() {
        return NO_TITLE.to_string();
    }
    title
        .replace(['\r', '\n'], " ")
        .replace(GEN_PLACEHOLDER, gen.map_or("", GenBasis::description))
        .replace(FILENAME_PLACEHOLDER, naming.basename())
        .trim_end()
        .to_string()
}

fn render_block(
    config: &JobConfiguration,
    phase: &Phase,
    route_line: &str,
    title: &str,
    gen: Option<&GenBasis>,
    naming: &FileNaming,
) -> String {
    let options = &config.options;
    let mut text = String::new();

    if phase.read_prev {
        text.push_str(LINK_SEPARATOR);
        text.push('\n');
    }
    if let Some(n_proc) = options.n_proc {
        text.push_str(&format!("%nprocshared={}\n", n_proc));
    }
    let memory = options.memory.trim();
    if !memory.is_empty() {
        text.push_str(&format!("%mem={}\n", memory));
    }
    text.push_str(&format!("%chk={}\n", naming.chk()));
    text.push_str(route_line);
    text.push_str("\n\n");

    if !phase.read_prev {
        text.push_str(title);
        text.push_str("\n\n");
        text.push_str(&format!("{} {}\n", config.charge, config.multiplicity));
        for line in config.structure() {
            text.push_str(line);
            text.push('\n');
        }
        text.push('\n');
    }

    if phase.job.takes_constraints() {
        if let Some(block) = options.modredundant_block() {
            text.push_str(&block);
            text.push('\n');
        }
    }

    if let Some(gen) = gen {
        text.push_str(&gen.text());
        text.push('\n');
    }

    match phase.job {
        PhaseJob::NaturalBondOrbital => {
            let mut nbo = vec!["$NBO"];
            nbo.extend(options.nbo_keywords.iter().map(String::as_str));
            nbo.push("$END");
            text.push_str(&nbo.join(" "));
            text.push_str("\n\n");
        }
        PhaseJob::WavefunctionExport => {
            text.push_str(&naming.wfx());
            text.push_str("\n\n");
        }
        _ => {}
    }

    // exactly one blank line closes the block
    let content = text.trim_end_matches('\n');
    format!("{}\n\n", content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispersionScheme;

    fn config(options: JobOptions) -> JobConfiguration {
        JobConfiguration::new(
            0,
            1,
            vec![
                "O   0.000000   0.000000   0.117300".to_string(),
                "H   0.000000   0.757200  -0.469200".to_string(),
                "H   0.000000  -0.757200  -0.469200".to_string(),
            ],
        )
        .unwrap()
        .with_options(options)
    }

    fn options_with(pairs: &[(&str, &str)]) -> JobOptions {
        let mut options = JobOptions::default();
        for (key, value) in pairs {
            options.set(key, value).unwrap();
        }
        options
    }

    fn composer() -> DeckComposer {
        let mut settings = Settings::default();
        settings.paths.external_basis_dir = "/nonexistent/gauprep/extbasis".into();
        DeckComposer::new(&settings)
    }

    #[test]
    fn test_plan_single_point_family() {
        for job in ["sp", "wfx", "nbo", "any"] {
            let phases = plan_phases(&options_with(&[("job_type", job), ("first_stable_check", "true")]));
            assert_eq!(phases.len(), 1);
            assert!(phases[0].stableopt);
            assert!(!phases[0].read_prev);
        }
    }

    #[test]
    fn test_plan_stability_check_then_job() {
        let phases = plan_phases(&options_with(&[("job_type", "opt"), ("first_stable_check", "yes")]));
        assert_eq!(
            phases,
            vec![
                Phase::new(PhaseJob::SinglePoint).stability_check(),
                Phase::new(PhaseJob::Optimization { frequency: false }).continuing(),
            ]
        );
    }

    #[test]
    fn test_plan_split_only_with_external_dispersion() {
        let mut options = options_with(&[("job_type", "opt+freq"), ("dispersion", "gd3")]);
        assert_eq!(
            plan_phases(&options),
            vec![Phase::new(PhaseJob::Optimization { frequency: true })]
        );

        options.dispersion_external_param = true;
        assert_eq!(
            plan_phases(&options),
            vec![
                Phase::new(PhaseJob::Optimization { frequency: false }),
                Phase::new(PhaseJob::Frequency).continuing(),
            ]
        );

        options.first_stable_check = true;
        let phases = plan_phases(&options);
        assert_eq!(phases.len(), 3);
        assert!(phases[1].read_prev && phases[2].read_prev);

        // external flag without a scheme does nothing
        options.dispersion = DispersionScheme::None;
        assert_eq!(plan_phases(&options).len(), 2);
    }

    #[test]
    fn test_plan_irc_is_never_split() {
        let options = options_with(&[
            ("job_type", "irc"),
            ("dispersion", "gd3bj"),
            ("dispersion_external_param", "true"),
        ]);
        assert_eq!(plan_phases(&options), vec![Phase::new(PhaseJob::ReactionPath)]);
    }

    #[test]
    fn test_render_title() {
        let naming = FileNaming::from_stem("water");
        assert_eq!(render_title("   ", None, &naming), NO_TITLE);
        assert_eq!(render_title("line one\nline two ", None, &naming), "line one line two");
        assert_eq!(render_title("${FILENAME} run", None, &naming), "water run");
        assert_eq!(render_title("basis: ${GEN}", None, &naming), "basis:");
    }

    #[test]
    fn test_single_block_layout() {
        let options = options_with(&[("job_type", "sp"), ("n_proc", "8"), ("memory", "16GB"), ("title", "water")]);
        let deck = composer()
            .compose(&config(options), &FileNaming::from_stem("water"))
            .unwrap();
        assert_eq!(
            deck.render(),
            "%nprocshared=8\n\
             %mem=16GB\n\
             %chk=water.chk\n\
             #P SP B3LYP def2SVP INT=ultrafine SCF=(tight,xqc)\n\
             \n\
             water\n\
             \n\
             0 1\n\
             O   0.000000   0.000000   0.117300\n\
             H   0.000000   0.757200  -0.469200\n\
             H   0.000000  -0.757200  -0.469200\n\
             \n"
        );
        assert_eq!(deck.to_string(), deck.render());
    }

    #[test]
    fn test_continuing_block_omits_molecule() {
        let options = options_with(&[("job_type", "freq"), ("first_stable_check", "true")]);
        let deck = composer()
            .compose(&config(options), &FileNaming::from_stem("w"))
            .unwrap();
        assert_eq!(deck.blocks().len(), 2);
        let second = deck.blocks()[1].text();
        assert!(second.starts_with("--Link1--\n%chk=w.chk\n#P FREQ=noraman UB3LYP"));
        assert!(!second.contains("0 1\n"));
        assert!(second.ends_with("geom=allcheck\nINT=ultrafine SCF=(tight,xqc)\n\n"));
    }

    #[test]
    fn test_constraints_and_trailers() {
        let options = options_with(&[("job_type", "opt"), ("opt_modredundant", " B 1 2 F \n\n")]);
        let deck = composer()
            .compose(&config(options), &FileNaming::from_stem("w"))
            .unwrap();
        assert!(deck.render().ends_with("H   0.000000  -0.757200  -0.469200\n\nB 1 2 F\n\n"));

        let options = options_with(&[("job_type", "nbo"), ("nbo_keywords", "bndidx  e2pert")]);
        let deck = composer()
            .compose(&config(options), &FileNaming::from_stem("w"))
            .unwrap();
        assert!(deck.render().ends_with("\n\n$NBO bndidx e2pert $END\n\n"));

        let options = options_with(&[("job_type", "wfx")]);
        let deck = composer()
            .compose(&config(options), &FileNaming::from_stem("w"))
            .unwrap();
        assert!(deck.render().ends_with("\n\nw.wfx\n\n"));
    }

    #[test]
    fn test_every_block_ends_with_one_blank_line() {
        let options = options_with(&[
            ("job_type", "ts"),
            ("basis_h_ecp", "LANL2DZ"),
            ("first_stable_check", "true"),
        ]);
        let structure = vec!["Pd 0.0 0.0 0.0".to_string(), "C 2.0 0.0 0.0".to_string()];
        let config = JobConfiguration::new(0, 1, structure).unwrap().with_options(options);
        let deck = composer().compose(&config, &FileNaming::from_stem("pd")).unwrap();
        for block in deck.blocks() {
            assert!(block.text().ends_with("\n\n"));
            assert!(!block.text().ends_with("\n\n\n"));
            assert!(block.text().contains("Gen Pseudo=read"));
        }
    }

    #[test]
    fn test_missing_dispersion_table_is_fatal() {
        let mut settings = Settings::default();
        settings.paths.d3zero_params = "/nonexistent/D3ZERO.dat".into();
        let options = options_with(&[("dispersion", "gd3"), ("dispersion_external_param", "true")]);
        let err = DeckComposer::new(&settings)
            .compose(&config(options), &FileNaming::from_stem("w"))
            .unwrap_err();
        assert!(matches!(err, DeckError::Dispersion(DispersionError::Io(_))));
    }

    #[test]
    fn test_legacy_dispersion_override_not_supported() {
        let options = options_with(&[("dispersion", "gd2"), ("dispersion_external_param", "true")]);
        let err = composer()
            .compose(&config(options), &FileNaming::from_stem("w"))
            .unwrap_err();
        assert!(matches!(
            err,
            DeckError::Dispersion(DispersionError::NotSupported { .. })
        ));
    }
}
