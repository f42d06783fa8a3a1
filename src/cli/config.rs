//! Configuration file handling
//!
//! `storefront.json`:
//! - `data_dir`: journal location, required for the `file` store
//! - `store`: `"file"` (default) or `"memory"`
//! - `admin_email`: only this user may create products, when set
//! - `min_password_length`: default 6
//! - `log_level`: `trace`, `info` (default), `warn`, `error` or `fatal`

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::auth::PasswordPolicy;
use crate::observability::Severity;

/// Document store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Durable journal under `data_dir`
    #[default]
    File,
    /// Process-local, lost on exit
    Memory,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::File => "file",
            StoreKind::Memory => "memory",
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<String>,

    #[serde(default)]
    pub store: StoreKind,

    #[serde(default)]
    pub admin_email: Option<String>,

    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_min_password_length() -> usize {
    6
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.store == StoreKind::File
            && self.data_dir.as_deref().map_or(true, |dir| dir.trim().is_empty())
        {
            return Err(CliError::config_error(
                "data_dir is required when store is 'file'",
            ));
        }

        if self.min_password_length == 0 {
            return Err(CliError::config_error("min_password_length must be > 0"));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(CliError::config_error(format!(
                "Invalid log_level: '{}'",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> Option<&Path> {
        self.data_dir.as_deref().map(Path::new)
    }

    pub fn log_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.min_password_length,
        }
    }
}
