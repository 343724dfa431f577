// Cache defaults loaded from configuration files

use crate::cache_control::DirectiveArg;
use crate::defaults::CacheDefaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// A directive list in configuration form.
///
/// Uses the same names as code declarations (`no_cache`, `s_max_age`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveConfig {
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub values: BTreeMap<String, i64>,
}

impl DirectiveConfig {
    pub fn to_args(&self) -> Vec<DirectiveArg> {
        directive_args(&self.flags, &self.values)
    }
}

/// A relative expiry in configuration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiresConfig {
    pub seconds: u64,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub values: BTreeMap<String, i64>,
}

impl ExpiresConfig {
    pub fn to_args(&self) -> Vec<DirectiveArg> {
        directive_args(&self.flags, &self.values)
    }
}

fn directive_args(flags: &[String], values: &BTreeMap<String, i64>) -> Vec<DirectiveArg> {
    let mut args: Vec<DirectiveArg> = flags.iter().cloned().map(DirectiveArg::from).collect();
    if !values.is_empty() {
        args.push(DirectiveArg::values(
            values.iter().map(|(key, seconds)| (key.clone(), *seconds)),
        ));
    }
    args
}

/// Class-level defaults for one handler, as read from a file.
///
/// ```toml
/// [cache_control]
/// flags = ["public", "must_revalidate"]
/// values = { s_max_age = 600 }
///
/// [expires]
/// seconds = 300
/// flags = ["public"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDefaultsConfig {
    #[serde(default)]
    pub cache_control: Option<DirectiveConfig>,
    #[serde(default)]
    pub expires: Option<ExpiresConfig>,
}

impl CacheDefaultsConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a `.json` or `.toml` file, detected by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(FileFormat::from_extension)
            .ok_or_else(|| {
                Error::Config(format!("Unsupported config file: {}", path.display()))
            })?;

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        match format {
            FileFormat::Json => Self::from_json(&content),
            FileFormat::Toml => Self::from_toml(&content),
        }
    }

    /// Declare the configured defaults.
    ///
    /// Validation matches code declarations, and existing defaults are kept.
    pub fn apply(&self, defaults: &CacheDefaults) -> Result<()> {
        if let Some(cache_control) = &self.cache_control {
            defaults.cache_control(cache_control.to_args())?;
        }
        if let Some(expires) = &self.expires {
            defaults.expires(Duration::from_secs(expires.seconds), expires.to_args())?;
        }
        Ok(())
    }
}
