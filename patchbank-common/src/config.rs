//! Bootstrap configuration
//!
//! Every path setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is never an error: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PATCHBANK_CONFIG";
/// Environment variable for the raw asset tree
pub const SOURCE_ROOT_ENV: &str = "PATCHBANK_SOURCE_ROOT";
/// Environment variable for the normalized asset store (schema A)
pub const STORE_ENV: &str = "PATCHBANK_STORE";
/// Environment variable for the instrument store (schema B)
pub const INSTRUMENT_STORE_ENV: &str = "PATCHBANK_INSTRUMENT_STORE";

/// Default file name of the normalized asset store
pub const DEFAULT_STORE_FILE: &str = "synth-assets.db";
/// Default file name of the instrument store
pub const DEFAULT_INSTRUMENT_STORE_FILE: &str = "synth-instruments.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root of the raw asset tree (wavetables_*/patches_* live below it)
    #[serde(default)]
    pub source_root: Option<PathBuf>,

    /// Normalized asset store (schema A)
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Instrument store (schema B)
    #[serde(default)]
    pub instrument_store_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub classify: ClassifyConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Ingestion tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Concurrent parse workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Records per store transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Path prefixes (relative to the source root) to list
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            prefixes: default_prefixes(),
        }
    }
}

/// Classification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Optional TOML ruleset replacing the built-in keyword tables
    #[serde(default)]
    pub ruleset: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_batch_size() -> usize {
    50
}

fn default_prefixes() -> Vec<String> {
    vec![String::new()]
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file if one can be found, otherwise use defaults
    ///
    /// An explicitly named file that fails to parse is still an error; only
    /// absence degrades to defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match locate_config_file(explicit) {
            Some(path) if path.exists() => {
                info!("Loading config: {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!("Config file not found: {} (using defaults)", path.display());
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ingest.workers == 0 {
            return Err(Error::Config("ingest.workers must be at least 1".to_string()));
        }
        if self.ingest.batch_size == 0 {
            return Err(Error::Config("ingest.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Resolve the normalized asset store path
    pub fn resolve_store_path(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_path(cli_arg, STORE_ENV, self.store_path.as_deref(), || {
            default_data_dir().join(DEFAULT_STORE_FILE)
        })
    }

    /// Resolve the instrument store path
    pub fn resolve_instrument_store_path(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_path(
            cli_arg,
            INSTRUMENT_STORE_ENV,
            self.instrument_store_path.as_deref(),
            || default_data_dir().join(DEFAULT_INSTRUMENT_STORE_FILE),
        )
    }

    /// Resolve the raw asset tree root
    pub fn resolve_source_root(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_path(cli_arg, SOURCE_ROOT_ENV, self.source_root.as_deref(), || {
            PathBuf::from("./external/surge")
        })
    }
}

/// Resolve one path setting through the CLI → ENV → TOML → default chain
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
    default: impl FnOnce() -> PathBuf,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: Compiled default
    default()
}

/// Find the config file: explicit argument, then PATCHBANK_CONFIG, then the
/// per-user config directory
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("patchbank").join("config.toml"))
        .filter(|p| p.exists())
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("patchbank"))
        .unwrap_or_else(|| PathBuf::from("./patchbank_data"))
}
