//! # Configuration
//!
//! Load order: `--config <file>` (or `./artgraph.toml` if present) →
//! environment variables → command-line flags. Missing keys fall back to
//! defaults.
//!
//! ```toml
//! database = "artgraph.db"
//! backend = "redb"
//! log_format = "json"
//! log_filter = "artgraph=info,artgraph_core=info"
//! ```

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "artgraph.toml";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "ARTGRAPH_LOG_FORMAT";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("unknown log format {0:?} (expected \"text\" or \"json\")")]
    LogFormat(String),
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database (ACID, written in place).
    #[default]
    Redb,
    /// Snapshot file, loaded into memory and rewritten after each change.
    File,
}

impl Backend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::File => "file",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::LogFormat(other.to_string())),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the graph database.
    pub database: PathBuf,
    pub backend: Backend,
    pub log_format: LogFormat,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("artgraph.db"),
            backend: Backend::Redb,
            log_format: LogFormat::Text,
            log_filter: "artgraph=info,artgraph_core=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration, then apply environment overrides.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            config.log_format = format.parse()?;
        }
        Ok(config)
    }

    /// Parse one TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
