//! Runtime configuration for catalog callers.
//!
//! # Responsibility
//! - Hold page-size policy applied by `CatalogService`.
//! - Read process-level settings (database path, logging) from environment.
//!
//! # Invariants
//! - `default_page_size` is positive and never exceeds `max_page_size`.
//! - Parsing never panics; bad values are reported as `ConfigError`.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "HYDROCAT_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "HYDROCAT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HYDROCAT_LOG_DIR";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "HYDROCAT_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "HYDROCAT_MAX_PAGE_SIZE";

const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 500;

/// Configuration parsing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but not a positive integer.
    InvalidNumber { key: String, value: String },
    /// Default page size is larger than the maximum.
    DefaultExceedsMax { default: u32, max: u32 },
    /// A page-size setting is zero.
    ZeroPageSize { field: &'static str },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "`{key}` must be a positive integer, got `{value}`")
            }
            Self::DefaultExceedsMax { default, max } => write!(
                f,
                "default page size {default} exceeds max page size {max}"
            ),
            Self::ZeroPageSize { field } => write!(f, "{field} must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

/// Page-size policy for service callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    /// Used when the caller omits a page size.
    pub default_page_size: u32,
    /// Larger requests are clamped to this value.
    pub max_page_size: u32,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PageSettings {
    /// Builds settings, rejecting zero sizes and a default above the maximum.
    pub fn new(default_page_size: u32, max_page_size: u32) -> Result<Self, ConfigError> {
        if default_page_size == 0 {
            return Err(ConfigError::ZeroPageSize {
                field: "default_page_size",
            });
        }
        if max_page_size == 0 {
            return Err(ConfigError::ZeroPageSize {
                field: "max_page_size",
            });
        }
        if default_page_size > max_page_size {
            return Err(ConfigError::DefaultExceedsMax {
                default: default_page_size,
                max: max_page_size,
            });
        }
        Ok(Self {
            default_page_size,
            max_page_size,
        })
    }

    /// Resolves a requested page size.
    ///
    /// Non-positive requests pass through unchanged so the assembler can
    /// reject them.
    pub fn resolve(&self, requested: Option<i64>) -> i64 {
        match requested {
            None => i64::from(self.default_page_size),
            Some(value) if value > i64::from(self.max_page_size) => {
                i64::from(self.max_page_size)
            }
            Some(value) => value,
        }
    }
}

/// Process-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file; `None` means an in-memory catalog.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Rolling log directory; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub page: PageSettings,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            page: PageSettings::default(),
        }
    }
}

impl CoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a key to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let default_page_size = match non_blank(ENV_DEFAULT_PAGE_SIZE) {
            Some(value) => parse_positive(ENV_DEFAULT_PAGE_SIZE, &value)?,
            None => defaults.page.default_page_size,
        };
        let max_page_size = match non_blank(ENV_MAX_PAGE_SIZE) {
            Some(value) => parse_positive(ENV_MAX_PAGE_SIZE, &value)?,
            None => defaults.page.max_page_size,
        };

        Ok(Self {
            db_path: non_blank(ENV_DB_PATH).map(PathBuf::from),
            log_level: non_blank(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: non_blank(ENV_LOG_DIR).map(PathBuf::from),
            page: PageSettings::new(default_page_size, max_page_size)?,
        })
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
