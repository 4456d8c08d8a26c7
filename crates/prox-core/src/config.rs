//! Configuration loading for prox.
//!
//! The config file names the external tools, caps their output, and says
//! where terminal devices live; everything has a working built-in default.
//!
//! Resolution order (highest to lowest priority):
//! 1. Explicit path (`--config`)
//! 2. `PROX_CONFIG` environment variable (file path)
//! 3. `$XDG_CONFIG_HOME/prox/config.json`
//! 4. Built-in defaults

use crate::collect::DEFAULT_MAX_OUTPUT_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Environment variable holding an explicit config file path.
pub const ENV_CONFIG_PATH: &str = "PROX_CONFIG";

const CONFIG_DIR_NAME: &str = "prox";
const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl From<ConfigError> for prox_common::Error {
    fn from(err: ConfigError) -> Self {
        prox_common::Error::Config(err.to_string())
    }
}

/// External tool binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Process listing tool.
    pub ps: String,
    /// Open-file listing tool.
    pub lsof: String,
    /// Largest tool stdout accepted, in bytes.
    pub max_output_bytes: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ps: "ps".to_string(),
            lsof: "lsof".to_string(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Terminal device settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Directory that tty names are relative to.
    pub device_dir: PathBuf,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from("/dev"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxConfig {
    pub schema_version: String,
    pub tools: ToolsConfig,
    pub terminal: TerminalConfig,
}

impl Default for ProxConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            tools: ToolsConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    Environment,
    XdgConfig,
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: ProxConfig,
    /// Path the config was read from (None for defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file path (highest priority).
    pub config_path: Option<PathBuf>,
    /// Override for the XDG config home (tests).
    pub config_home: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
///
/// An explicit path (CLI or environment) must exist; the XDG file is
/// optional.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    if let Some(path) = &options.config_path {
        return load_required(path, ConfigSource::CliArgument);
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        if !path.is_empty() {
            return load_required(Path::new(&path), ConfigSource::Environment);
        }
    }

    if let Some(path) = xdg_config_path(options) {
        if path.exists() {
            let config = load_config_file(&path)?;
            debug!(path = %path.display(), "loaded XDG config");
            return Ok(ResolvedConfig {
                config,
                path: Some(path),
                source: ConfigSource::XdgConfig,
            });
        }
    }

    Ok(ResolvedConfig {
        config: ProxConfig::default(),
        path: None,
        source: ConfigSource::BuiltinDefault,
    })
}

fn load_required(path: &Path, source: ConfigSource) -> Result<ResolvedConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let config = load_config_file(path)?;
    debug!(path = %path.display(), %source, "loaded config");
    Ok(ResolvedConfig {
        config,
        path: Some(path.to_path_buf()),
        source,
    })
}

fn xdg_config_path(options: &ConfigOptions) -> Option<PathBuf> {
    let home = options.config_home.clone().or_else(dirs::config_dir)?;
    Some(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load and version-check a single config file.
pub fn load_config_file(path: &Path) -> Result<ProxConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: ProxConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::VersionMismatch {
            expected: CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    Ok(config)
}
