//! Resolver configuration.
//!
//! Built in code, or read from a JSON, YAML or TOML document. Missing fields
//! take their defaults.

use crate::lookup::DEFAULT_MAX_CHAIN_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Tunables for [`GraphTransformerResolver`](crate::GraphTransformerResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of converters in a resolved chain. Must be at least 1.
    pub max_chain_length: usize,
    /// Whether resolutions are cached until the graph changes.
    pub cache: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            cache: true,
        }
    }
}

/// Document formats a [`ResolverConfig`] can be read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    Json,
    #[default]
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Format implied by a file extension, if it is one we read.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for ConfigFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_chain_length(mut self, length: usize) -> Self {
        self.max_chain_length = length;
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Read configuration, taking the format from the path's extension.
    ///
    /// YAML when there is no path or the extension is not recognised.
    pub fn from_bytes(data: &[u8], path: Option<&Path>) -> Result<Self, ConfigError> {
        let format = path.and_then(ConfigFormat::from_path).unwrap_or_default();
        Self::parse(data, format)
    }

    /// Read configuration in a known format and check it.
    pub fn parse(data: &[u8], format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_slice(data)?,
            ConfigFormat::Yaml => serde_yaml::from_slice(data)?,
            ConfigFormat::Toml => toml::from_str(std::str::from_utf8(data)?)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_bytes(&self, format: ConfigFormat) -> Result<Vec<u8>, ConfigError> {
        Ok(match format {
            ConfigFormat::Json => serde_json::to_vec_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?.into_bytes(),
            ConfigFormat::Toml => toml::to_string_pretty(self)?.into_bytes(),
        })
    }

    /// A chain bound of zero would make every lookup come back empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chain_length == 0 {
            return Err(ConfigError::ZeroChainLength);
        }
        Ok(())
    }
}

/// Errors from reading or writing resolver configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid JSON resolver config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML resolver config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML resolver config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot write TOML resolver config: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("resolver config is not UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("max_chain_length must be at least 1")]
    ZeroChainLength,
}
