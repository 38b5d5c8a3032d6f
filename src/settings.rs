//! Configuration management for gauprep.
//!
//! Site-specific paths and route defaults are read from INI-format
//! configuration files with the following precedence:
//!
//! 1. Local configuration (`./gauprep.cfg`)
//! 2. User configuration (`~/.config/gauprep/gauprep.cfg`)
//! 3. System configuration (`/etc/gauprep/gauprep.cfg`)
//! 4. Built-in defaults
//!
//! Each file only needs the keys it changes; everything else keeps the value
//! from the lower-priority sources.
//!
//! # Configuration File Format
//!
//! ```ini
//! [paths]
//! external_basis_dir = ./extbasis
//! d3zero_params = ./settings/D3ZERO.dat
//! d3bj_params = ./settings/D3BJ.dat
//!
//! [route]
//! default_keywords = INT=ultrafine SCF=(tight,xqc)
//!
//! [logging]
//! level = info
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use gauprep::settings::SettingsManager;
//!
//! let settings = SettingsManager::load()?;
//! println!("Basis libraries in {}", settings.paths().external_basis_dir.display());
//! # Ok::<(), gauprep::settings::ConfigError>(())
//! ```

use crate::dispersion::DispersionFamily;
use configparser::ini::Ini;
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of local, user and system configuration files.
pub const CONFIG_FILE_NAME: &str = "gauprep.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

type SectionMap = HashMap<String, Option<String>>;

/// Main configuration structure containing all program settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Locations of basis libraries and dispersion parameter files
    pub paths: PathSettings,
    /// Route-line defaults
    pub route: RouteSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Locations of external data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory searched for `<basis>.gbs` library files (default: "./extbasis")
    pub external_basis_dir: PathBuf,
    /// D3 zero-damping parameter table (default: "./settings/D3ZERO.dat")
    pub d3zero_params: PathBuf,
    /// D3 Becke-Johnson parameter table (default: "./settings/D3BJ.dat")
    pub d3bj_params: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            external_basis_dir: PathBuf::from("./extbasis"),
            d3zero_params: PathBuf::from("./settings/D3ZERO.dat"),
            d3bj_params: PathBuf::from("./settings/D3BJ.dat"),
        }
    }
}

impl PathSettings {
    /// Parameter table of a dispersion family, `None` for the legacy family.
    pub fn dispersion_params(&self, family: DispersionFamily) -> Option<&Path> {
        match family {
            DispersionFamily::ZeroDamping => Some(self.d3zero_params.as_path()),
            DispersionFamily::BeckeJohnson => Some(self.d3bj_params.as_path()),
            DispersionFamily::Legacy => None,
        }
    }
}

/// Route-line settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSettings {
    /// Keywords appended to every route line (default: "INT=ultrafine SCF=(tight,xqc)")
    pub default_keywords: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            default_keywords: "INT=ultrafine SCF=(tight,xqc)".to_string(),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Level filter for the logger; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Configuration manager that handles loading and accessing program settings.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads configuration from the standard locations.
    ///
    /// Searches, from lowest to highest priority:
    /// 1. `/etc/gauprep/gauprep.cfg` (system configuration)
    /// 2. `~/.config/gauprep/gauprep.cfg` (user configuration)
    /// 3. `./gauprep.cfg` (current working directory)
    ///
    /// Files that are missing are skipped silently; files that fail to parse
    /// are skipped with a warning.
    pub fn load() -> Result<Self, ConfigError> {
        let candidates: Vec<PathBuf> = [
            Self::get_system_config_path(),
            Self::get_user_config_path(),
            Some(PathBuf::from(CONFIG_FILE_NAME)),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self::load_from_paths(&candidates)
    }

    /// Loads configuration from `paths`, ordered from lowest to highest priority.
    pub fn load_from_paths(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::load_config(path, &settings) {
                Ok(loaded) => {
                    settings = loaded;
                    config_source = path.display().to_string();
                    debug!("Loaded configuration from: {}", path.display());
                }
                Err(e) => {
                    warn!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }

        info!("Configuration loaded from: {}", config_source);
        Ok(Self {
            settings,
            config_source,
        })
    }

    /// Loads a single configuration file over the built-in defaults.
    ///
    /// Unlike [`SettingsManager::load`], a file that cannot be read or parsed is
    /// an error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::load_config(path, &Settings::default())?;
        Ok(Self {
            settings,
            config_source: path.display().to_string(),
        })
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the path settings.
    pub fn paths(&self) -> &PathSettings {
        &self.settings.paths
    }

    /// Gets the route settings.
    pub fn route(&self) -> &RouteSettings {
        &self.settings.route
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Applies one INI file on top of `base`.
    fn load_config(path: &Path, base: &Settings) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        ini.read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let mut settings = base.clone();
        let map = ini.get_map_ref();

        if let Some(paths_map) = map.get("paths") {
            Self::parse_paths(paths_map, &mut settings.paths);
        }
        if let Some(route_map) = map.get("route") {
            Self::parse_route(route_map, &mut settings.route);
        }
        if let Some(logging_map) = map.get("logging") {
            Self::parse_logging(logging_map, &mut settings.logging)?;
        }

        Ok(settings)
    }

    fn parse_paths(section: &SectionMap, paths: &mut PathSettings) {
        if let Some(dir) = non_empty(section, "external_basis_dir") {
            paths.external_basis_dir = PathBuf::from(dir);
        }
        if let Some(file) = non_empty(section, "d3zero_params") {
            paths.d3zero_params = PathBuf::from(file);
        }
        if let Some(file) = non_empty(section, "d3bj_params") {
            paths.d3bj_params = PathBuf::from(file);
        }
    }

    fn parse_route(section: &SectionMap, route: &mut RouteSettings) {
        // an explicitly empty value removes the default keywords
        if let Some(Some(keywords)) = section.get("default_keywords") {
            route.default_keywords = keywords.trim().to_string();
        }
    }

    fn parse_logging(section: &SectionMap, logging: &mut LoggingSettings) -> Result<(), ConfigError> {
        if let Some(level) = non_empty(section, "level") {
            level
                .parse::<LevelFilter>()
                .map_err(|_| ConfigError::InvalidValue(format!("Invalid log level: {}", level)))?;
            logging.level = level.to_lowercase();
        }
        Ok(())
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/gauprep").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("gauprep").join(CONFIG_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("gauprep")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("gauprep").join(CONFIG_FILE_NAME))
        }
    }
}

fn non_empty<'a>(section: &'a SectionMap, key: &str) -> Option<&'a str> {
    section
        .get(key)
        .and_then(|value| value.as_deref())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl SettingsManager {
    /// Creates a gauprep.cfg template with every option at its default value.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        let template_content = Self::generate_template_content();
        fs::write(path, template_content)?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    /// Generates the content for a gauprep.cfg template file.
    fn generate_template_content() -> String {
        let defaults = Settings::default();
        format!(
            r#"# gauprep configuration file
#
# Configuration files are loaded in hierarchical order with local settings taking precedence:
#
# 1. Current working directory (./gauprep.cfg) - highest priority
# 2. User config directory (~/.config/gauprep/gauprep.cfg on Unix, %APPDATA%/gauprep/gauprep.cfg on Windows)
# 3. System config directory (/etc/gauprep/gauprep.cfg on Unix, %PROGRAMDATA%/gauprep/gauprep.cfg on Windows)
# 4. Built-in defaults (fallback)
#
# Any missing sections or values keep the value from the lower-priority source.

[paths]
# Directory holding external basis-set libraries (<name>.gbs)
# A basis name matching a file stem here (case-insensitive) is read from the file
external_basis_dir = {}

# DFT-D3 parameter tables, one section per functional
# Zero damping: s6, s8, sr6
d3zero_params = {}
# Becke-Johnson damping: s6, s8, a1, a2
d3bj_params = {}

[route]
# Keywords appended to every route line
default_keywords = {}

[logging]
# Log level: off, error, warn, info, debug, trace (default: info)
# RUST_LOG overrides this value
level = {}
"#,
            defaults.paths.external_basis_dir.display(),
            defaults.paths.d3zero_params.display(),
            defaults.paths.d3bj_params.display(),
            defaults.route.default_keywords,
            defaults.logging.level,
        )
    }
}
