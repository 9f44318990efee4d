// crates/modvet-config/src/config.rs
// ============================================================================
// Module: modvet Configuration
// Description: Configuration loading and validation for modvet.
// Purpose: Provide strict config parsing with hard limits and sane defaults.
// Dependencies: modvet-core, modvet-dispatch, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the command line, then `MODVET_CONFIG`, then
//! `modvet.toml` in the working directory. An explicitly named file must
//! exist; when the default file is absent the built-in defaults apply.
//!
//! Every section is optional and every field has a default matching the
//! historical command-line flags.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use modvet_core::LogLevel;
use modvet_dispatch::DispatchSettings;
use modvet_dispatch::ValidatorSettings;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "modvet.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MODVET_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Hard ceiling for accepted request bodies.
pub const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Longest accepted interval between periodic snapshots (one week).
pub const MAX_SAVE_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Complete modvet configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModvetConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Snapshot storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// External validator invocation.
    #[serde(default)]
    pub validator: ValidatorSettings,
    /// Worker pool sizing.
    #[serde(default)]
    pub dispatch: DispatchSettings,
    /// Audit log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|_| {
            ConfigError::Invalid(format!("server.bind is not a socket address: {}", self.bind))
        })
    }

    /// Validates listener settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Snapshot storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding `pkgdata-*` snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Seconds between periodic snapshots.
    #[serde(default = "default_save_interval_secs")]
    pub save_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            save_interval_secs: default_save_interval_secs(),
        }
    }
}

impl StorageConfig {
    /// Returns the periodic snapshot interval.
    #[must_use]
    pub const fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    /// Validates storage settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("storage.data_dir", &self.data_dir.to_string_lossy())?;
        if self.save_interval_secs == 0 || self.save_interval_secs > MAX_SAVE_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "storage.save_interval_secs must be between 1 and {MAX_SAVE_INTERVAL_SECS}"
            )));
        }
        Ok(())
    }
}

/// Audit log settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level written.
    #[serde(default)]
    pub level: LogLevel,
    /// Append audit events to this file instead of stderr.
    #[serde(default)]
    pub audit_path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.audit_path {
            validate_path_string("logging.audit_path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ModvetConfig {
    /// Loads configuration from disk using the standard resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit file is missing or any file
    /// fails limits, parsing, or validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let mut config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::parse(content)?;
        config.source = Some(resolved);
        Ok(config)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.storage.validate()?;
        self.validator.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        self.dispatch.validate().map_err(|err| ConfigError::Invalid(err.to_string()))?;
        self.logging.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag is true for explicit sources.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default storage directory.
fn default_data_dir() -> PathBuf {
    PathBuf::from("/tmp/go_data")
}

/// Default snapshot interval (one hour).
const fn default_save_interval_secs() -> u64 {
    60 * 60
}
