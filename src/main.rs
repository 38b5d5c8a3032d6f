//! gauprep command-line interface
//!
//! # Usage
//!
//! gauprep supports two commands:
//!
//! 1. **Deck composition** (`gauprep <structure_file> [output_file] [options]`):
//!    Reads charge, multiplicity and coordinates from a structure file and
//!    writes a Gaussian input deck
//!
//! 2. **Template creation** (`gauprep ci gauprep.cfg` or `gauprep ci <preset.json>`):
//!    Writes a commented settings template or a default option preset
//!
//! # Examples
//!
//! ```bash
//! # Optimization + frequency deck next to the structure (water.gjf)
//! gauprep water.xyz
//!
//! # TS search with tabulated D3(BJ) parameters, options from a preset
//! gauprep ts_guess.log ts.gjf --preset ts.json --set dispersion=GD3BJ \
//!     --set dispersion_external_param=true
//!
//! # Templates
//! gauprep ci gauprep.cfg
//! gauprep ci defaults.json
//! ```
//!
//! # Supported Structure Formats
//!
//! - `.xyz` - XYZ coordinate files (last frame, neutral singlet)
//! - `.log`/`.out` - Gaussian output files (last orientation table)
//! - anything else - Gaussian input files

use gauprep::config::JobOptions;
use gauprep::deck::DeckComposer;
use gauprep::naming::FileNaming;
use gauprep::presets;
use gauprep::settings::{SettingsManager, CONFIG_FILE_NAME};
use gauprep::structure_reader::read_single_file;
use log::info;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

/// Parsed arguments of the deck composition command.
#[derive(Debug, Default)]
struct ComposeArgs {
    structure: PathBuf,
    output: Option<PathBuf>,
    preset: Option<PathBuf>,
    assignments: Vec<(String, String)>,
}

fn main() {
    // env_logger passes every record; `log::set_max_level` is the ceiling
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Trace)
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis()
        .init();
    let rust_log = env::var("RUST_LOG").ok();
    if let Some(level) = effective_level(log::LevelFilter::Info, rust_log.as_deref()) {
        log::set_max_level(level);
    }

    let args: Vec<String> = env::args().collect();
    let program = program_name(&args);
    if args.len() < 2 {
        print_usage(program);
        process::exit(1);
    }

    if args[1] == "--help" || args[1] == "-h" {
        print_usage(program);
        process::exit(0);
    }

    let manager = match SettingsManager::load() {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            process::exit(1);
        }
    };
    if let Some(level) = effective_level(manager.logging().level_filter(), rust_log.as_deref()) {
        log::set_max_level(level);
    }
    info!("Settings source: {}", manager.config_source());

    match args[1].as_str() {
        "ci" => {
            let Some(file_arg) = args.get(2) else {
                eprintln!("Error: Missing file argument");
                eprintln!("Usage:");
                eprintln!("  {} ci {}      - Create settings template", program, CONFIG_FILE_NAME);
                eprintln!("  {} ci <preset.json> - Create default option preset", program);
                process::exit(1);
            };
            match run_create_template(Path::new(file_arg)) {
                Ok(()) => println!("Template created: {}", file_arg),
                Err(e) => {
                    eprintln!("Error creating template: {}", e);
                    process::exit(1);
                }
            }
        }
        _ => {
            let compose_args = match parse_compose_args(&args[1..]) {
                Ok(compose_args) => compose_args,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    print_usage(program);
                    process::exit(1);
                }
            };
            match run_compose(&compose_args, &manager) {
                Ok(output) => println!("Deck written: {}", output.display()),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}

/// Binary name for usage messages; argv may be empty.
fn program_name(args: &[String]) -> &str {
    args.first().map_or("gauprep", String::as_str)
}

/// Level to apply as the logging ceiling; `None` when RUST_LOG decides.
fn effective_level(configured: log::LevelFilter, rust_log: Option<&str>) -> Option<log::LevelFilter> {
    match rust_log {
        Some(spec) if !spec.trim().is_empty() => None,
        _ => Some(configured),
    }
}

/// Prints usage information to stderr.
fn print_usage(program_name: &str) {
    eprintln!("gauprep - Gaussian input deck composer");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} <structure_file> [output_file] [--preset FILE] [--set key=value]...", program_name);
    eprintln!("                    Compose a deck from a structure file");
    eprintln!();
    eprintln!("  {} ci {}", program_name, CONFIG_FILE_NAME);
    eprintln!("                    Create a settings template file");
    eprintln!();
    eprintln!("  {} ci <preset.json>", program_name);
    eprintln!("                    Create a preset with the default job options");
    eprintln!();
    eprintln!("Supported structure formats:");
    eprintln!("  .xyz        - XYZ coordinate file (last frame)");
    eprintln!("  .log, .out  - Gaussian output file");
    eprintln!("  other       - Gaussian input file");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} water.xyz", program_name);
    eprintln!("  {} ts_guess.log ts.gjf --set job_type=TS --set opt_calcfc=1", program_name);
    eprintln!("  {} complex.gjf --preset pd_catalysis.json", program_name);
}

/// Splits the command line into positionals, `--preset` and `--set` options.
fn parse_compose_args(args: &[String]) -> Result<ComposeArgs, String> {
    let mut parsed = ComposeArgs::default();
    let mut positionals = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--preset" => {
                let value = iter.next().ok_or("--preset requires a file")?;
                parsed.preset = Some(PathBuf::from(value));
            }
            "--set" => {
                let value = iter.next().ok_or("--set requires key=value")?;
                let (key, val) = value
                    .split_once('=')
                    .ok_or_else(|| format!("Expected key=value after --set, found '{}'", value))?;
                parsed.assignments.push((key.to_string(), val.to_string()));
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
            _ => positionals.push(PathBuf::from(arg)),
        }
    }

    let mut positionals = positionals.into_iter();
    parsed.structure = positionals.next().ok_or("Missing structure file")?;
    parsed.output = positionals.next();
    if let Some(extra) = positionals.next() {
        return Err(format!("Unexpected argument: {}", extra.display()));
    }
    Ok(parsed)
}

/// Reads the structure, applies options and writes the deck.
fn run_compose(args: &ComposeArgs, manager: &SettingsManager) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data = read_single_file(&args.structure)?;
    info!(
        "Read {} atoms (charge {}, multiplicity {}) from {}",
        data.structure.len(),
        data.charge,
        data.multiplicity,
        args.structure.display()
    );

    let mut options = match &args.preset {
        Some(path) => presets::load(path)?,
        None => JobOptions::default(),
    };
    for (key, value) in &args.assignments {
        options.set(key, value)?;
    }

    let config = data.into_configuration()?.with_options(options);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| FileNaming::default_deck_path(&args.structure));

    DeckComposer::new(manager.settings()).write(&config, &output)?;
    Ok(output)
}

/// Writes a settings template or a default preset, refusing to overwrite.
fn run_create_template(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!(
            "{} already exists. Please remove it first or choose a different location.",
            path.display()
        )
        .into());
    }

    let is_settings = path
        .file_name()
        .map_or(false, |name| name == CONFIG_FILE_NAME);
    let is_preset = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    if is_settings {
        SettingsManager::create_template(path)?;
    } else if is_preset {
        presets::save(&JobOptions::default(), path)?;
    } else {
        return Err(format!(
            "Cannot create a template for {}: expected {} or a .json preset",
            path.display(),
            CONFIG_FILE_NAME
        )
        .into());
    }
    Ok(())
}
