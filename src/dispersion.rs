//! DFT-D parameter tables and their encoding as Gaussian IOp overrides.
//!
//! Gaussian reads the D3 coefficients from internal options in overlay 3:
//!
//! | Slot    | Coefficient | Zero damping | Becke-Johnson damping |
//! |---------|-------------|--------------|-----------------------|
//! | `3/174` | s6          | value        | value                 |
//! | `3/175` | s8          | value        | value                 |
//! | `3/176` | sr6         | value        | `0` (engine default)  |
//! | `3/177` | a1          | -            | value                 |
//! | `3/178` | a2          | -            | value                 |
//!
//! A value `v` is written as the integer `round(v * 1000000)`, zero-padded to
//! seven digits. The conversion is done in decimal arithmetic so that
//! tabulated values such as `0.7220` map to exactly `0722000`.
//!
//! Parameter files are INI files with one section per functional:
//!
//! ```ini
//! [B3LYP]
//! s6 = 1.0
//! s8 = 1.9889
//! a1 = 0.3981
//! a2 = 4.4211
//! ```
//!
//! Section and key names are case-insensitive.

use crate::config::DispersionScheme;
use configparser::ini::Ini;
use log::debug;
use rust_decimal::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for dispersion parameter handling.
#[derive(Error, Debug)]
pub enum DispersionError {
    /// Parameter file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Parameter file is not valid INI
    #[error("INI parsing error in {}: {message}", .path.display())]
    IniParse {
        /// Parameter file
        path: PathBuf,
        /// Parser message
        message: String,
    },
    /// External parameters requested for a scheme without IOp support
    #[error("{scheme} dispersion with an external parameter file is not implemented")]
    NotSupported {
        /// Requested scheme
        scheme: DispersionScheme,
    },
    /// The functional has no section in the parameter file
    #[error("Valid DFT-D parameters for {functional} are not found in {}", .path.display())]
    MissingFunctional {
        /// Requested functional
        functional: String,
        /// Parameter file
        path: PathBuf,
    },
    /// A required coefficient is missing from the functional's section
    #[error("Parameter {parameter} for {functional} is missing in {}", .path.display())]
    MissingParameter {
        /// Requested functional
        functional: String,
        /// Coefficient name
        parameter: &'static str,
        /// Parameter file
        path: PathBuf,
    },
    /// A coefficient is not a non-negative decimal number
    #[error("Invalid value '{value}' for parameter {parameter} of {functional}")]
    InvalidValue {
        /// Requested functional
        functional: String,
        /// Coefficient name
        parameter: &'static str,
        /// Rejected text
        value: String,
    },
}

type Result<T> = std::result::Result<T, DispersionError>;

/// Damping families sharing one parameter layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispersionFamily {
    /// D3 with zero damping: s6, s8, sr6
    ZeroDamping,
    /// D3 with Becke-Johnson damping: s6, s8, a1, a2
    BeckeJohnson,
    /// D2; no IOp encoding available
    Legacy,
}

impl DispersionScheme {
    /// Family of the scheme, `None` when no dispersion is requested.
    pub fn family(self) -> Option<DispersionFamily> {
        match self {
            DispersionScheme::None => None,
            DispersionScheme::D3Zero => Some(DispersionFamily::ZeroDamping),
            DispersionScheme::D3BeckeJohnson => Some(DispersionFamily::BeckeJohnson),
            DispersionScheme::D2 => Some(DispersionFamily::Legacy),
        }
    }
}

/// Value written for a slot.
enum SlotValue {
    /// Coefficient read from the parameter table
    Parameter(&'static str),
    /// Fixed option code
    Fixed(&'static str),
}

/// (IOp slot, value) pairs in output order.
const ZERO_DAMPING_SLOTS: [(&str, SlotValue); 3] = [
    ("3/174", SlotValue::Parameter("s6")),
    ("3/175", SlotValue::Parameter("s8")),
    ("3/176", SlotValue::Parameter("sr6")),
];

const BECKE_JOHNSON_SLOTS: [(&str, SlotValue); 5] = [
    ("3/174", SlotValue::Parameter("s6")),
    ("3/175", SlotValue::Parameter("s8")),
    ("3/176", SlotValue::Fixed("0")),
    ("3/177", SlotValue::Parameter("a1")),
    ("3/178", SlotValue::Parameter("a2")),
];

impl DispersionFamily {
    fn slots(self) -> &'static [(&'static str, SlotValue)] {
        match self {
            DispersionFamily::ZeroDamping => &ZERO_DAMPING_SLOTS,
            DispersionFamily::BeckeJohnson => &BECKE_JOHNSON_SLOTS,
            DispersionFamily::Legacy => &[],
        }
    }

    /// Names of the coefficients read from the parameter table.
    pub fn parameter_names(self) -> Vec<&'static str> {
        self.slots()
            .iter()
            .filter_map(|(_, value)| match value {
                SlotValue::Parameter(name) => Some(*name),
                SlotValue::Fixed(_) => None,
            })
            .collect()
    }
}

/// Coefficients of one functional.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionParameterSet {
    /// Functional name as requested
    pub functional: String,
    /// Coefficient name -> value
    pub values: BTreeMap<String, Decimal>,
}

/// Parsed parameter file for one dispersion family.
#[derive(Debug, Clone)]
pub struct DispersionParameterTable {
    family: DispersionFamily,
    path: PathBuf,
    sections: HashMap<String, HashMap<String, Option<String>>>,
}

impl DispersionParameterTable {
    /// Loads the parameter file of a family.
    ///
    /// # Errors
    ///
    /// [`DispersionError::NotSupported`] for the legacy family, which has no
    /// IOp encoding, before the file is touched.
    pub fn load(scheme: DispersionScheme, path: &Path) -> Result<Self> {
        let family = supported_family(scheme)?;
        let content = fs::read_to_string(path)?;
        Self::parse(family, &content, path)
    }

    /// Parses parameter file content; `path` is only used in error messages.
    pub fn parse(family: DispersionFamily, content: &str, path: &Path) -> Result<Self> {
        let mut ini = Ini::new();
        let sections = ini.read(content.to_string()).map_err(|message| {
            DispersionError::IniParse {
                path: path.to_path_buf(),
                message,
            }
        })?;
        debug!(
            "Loaded {} dispersion parameter sections from {}",
            sections.len(),
            path.display()
        );
        Ok(Self {
            family,
            path: path.to_path_buf(),
            sections,
        })
    }

    /// Family this table belongs to.
    pub fn family(&self) -> DispersionFamily {
        self.family
    }

    /// True when the table has a section for `functional`.
    pub fn contains(&self, functional: &str) -> bool {
        self.sections.contains_key(&functional.trim().to_lowercase())
    }

    /// Coefficients of `functional` required by the table's family.
    pub fn parameters(&self, functional: &str) -> Result<DispersionParameterSet> {
        let functional = functional.trim();
        let section = self
            .sections
            .get(&functional.to_lowercase())
            .ok_or_else(|| DispersionError::MissingFunctional {
                functional: functional.to_string(),
                path: self.path.clone(),
            })?;

        let mut values = BTreeMap::new();
        for parameter in self.family.parameter_names() {
            let raw = section
                .get(parameter)
                .and_then(|value| value.as_deref())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| DispersionError::MissingParameter {
                    functional: functional.to_string(),
                    parameter,
                    path: self.path.clone(),
                })?;
            let value = parse_decimal(raw).ok_or_else(|| DispersionError::InvalidValue {
                functional: functional.to_string(),
                parameter,
                value: raw.to_string(),
            })?;
            values.insert(parameter.to_string(), value);
        }

        Ok(DispersionParameterSet {
            functional: functional.to_string(),
            values,
        })
    }

    /// Builds the composite `iOp(...)` directive for `functional`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gauprep::dispersion::{DispersionFamily, DispersionParameterTable};
    /// use std::path::Path;
    ///
    /// let table = DispersionParameterTable::parse(
    ///     DispersionFamily::BeckeJohnson,
    ///     "[B3LYP]\ns6 = 1.0\ns8 = 1.9889\na1 = 0.3981\na2 = 4.4211\n",
    ///     Path::new("D3BJ.dat"),
    /// )?;
    /// assert_eq!(
    ///     table.iop_directive("b3lyp")?,
    ///     "iOp(3/174=1000000,3/175=1988900,3/176=0,3/177=0398100,3/178=4421100)"
    /// );
    /// # Ok::<(), gauprep::dispersion::DispersionError>(())
    /// ```
    pub fn iop_directive(&self, functional: &str) -> Result<String> {
        let parameters = self.parameters(functional)?;

        let mut terms = Vec::new();
        for (slot, value) in self.family.slots() {
            let code = match value {
                SlotValue::Parameter(name) => {
                    let value = parameters.values.get(*name).ok_or_else(|| {
                        DispersionError::MissingParameter {
                            functional: parameters.functional.clone(),
                            parameter: *name,
                            path: self.path.clone(),
                        }
                    })?;
                    encode_fixed_point(*value).ok_or_else(|| DispersionError::InvalidValue {
                        functional: parameters.functional.clone(),
                        parameter: *name,
                        value: value.to_string(),
                    })?
                }
                SlotValue::Fixed(code) => code.to_string(),
            };
            terms.push(format!("{}={}", slot, code));
        }

        let directive = format!("iOp({})", terms.join(","));
        debug!("Dispersion override for {}: {}", parameters.functional, directive);
        Ok(directive)
    }
}

/// Returns the family of a scheme that supports IOp encoding.
pub fn supported_family(scheme: DispersionScheme) -> Result<DispersionFamily> {
    match scheme.family() {
        Some(DispersionFamily::Legacy) | None => Err(DispersionError::NotSupported { scheme }),
        Some(family) => Ok(family),
    }
}

/// Encodes a coefficient as `round(value * 10^6)` zero-padded to 7 digits.
///
/// Values of 10 and above produce more than seven digits. Returns `None`
/// when the scaled value overflows.
///
/// # Examples
///
/// ```
/// use gauprep::dispersion::encode_fixed_point;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(encode_fixed_point(Decimal::from_str("1.0").unwrap()).as_deref(), Some("1000000"));
/// assert_eq!(encode_fixed_point(Decimal::from_str("0.0001").unwrap()).as_deref(), Some("0000100"));
/// assert_eq!(encode_fixed_point(Decimal::MAX), None);
/// ```
pub fn encode_fixed_point(value: Decimal) -> Option<String> {
    let scaled = value
        .checked_mul(Decimal::from(1_000_000))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    Some(format!("{:0>7}", scaled.trunc().to_string()))
}

/// Parses a non-negative decimal written in plain or scientific notation.
fn parse_decimal(text: &str) -> Option<Decimal> {
    let value = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()?;
    if value.is_sign_negative() && !value.is_zero() {
        None
    } else {
        Some(value)
    }
}
