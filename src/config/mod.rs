//! Configuration loaded from a TOML file
//!
//! Every field has a default, so an empty file (or no file at all) describes a
//! collector that runs `zpool` from `PATH` and prints a text dump.
//!
//! ```toml
//! [zpool]
//! program = "/usr/sbin/zpool"
//! list_args = ["list", "-o", "name,size,alloc,free,ckpoint,expandsz,frag,cap,health"]
//! status_args = ["status"]
//!
//! [output]
//! format = "json"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub zpool: ZpoolConfig,
    pub output: OutputConfig,
}

/// How the `zpool` commands are invoked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZpoolConfig {
    /// Program name or path of the zpool binary
    pub program: String,
    /// Arguments producing the nine-column listing
    pub list_args: Vec<String>,
    /// Arguments for the status command; the pool name is appended
    pub status_args: Vec<String>,
}

impl Default for ZpoolConfig {
    fn default() -> Self {
        Self {
            program: "zpool".to_string(),
            list_args: vec![
                "list".to_string(),
                "-o".to_string(),
                "name,size,alloc,free,ckpoint,expandsz,frag,cap,health".to_string(),
            ],
            status_args: vec!["status".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Rendering used for the collected records on stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    /// Read and validate a configuration file
    ///
    /// # Errors
    ///
    /// `ConfigError::ReadError` if the file cannot be read, `TomlError` if it
    /// is not valid TOML, `ValidationError` if a value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zpool.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "zpool.program must not be empty".to_string(),
            ));
        }
        if self.zpool.list_args.is_empty() {
            return Err(ConfigError::ValidationError(
                "zpool.list_args must not be empty".to_string(),
            ));
        }
        if self.zpool.status_args.is_empty() {
            return Err(ConfigError::ValidationError(
                "zpool.status_args must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
