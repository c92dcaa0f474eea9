// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! CLI configuration, loaded from an optional `btidx.toml` (or a path named by `BTIDX_CONFIG`).
//!
//! A missing file is not an error — every setting has a built-in default. A present-but-malformed
//! file is reported and aborts startup, rather than being silently ignored.

use std::env;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::error::{IndexError, IndexResult};

const CONFIG_ENV_VAR: &str = "BTIDX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "btidx.toml";
const DEFAULT_HISTORY_FILE: &str = ".btidx_history";

/// REPL/CLI configuration. Every field has a built-in default and is independently optional in
/// the TOML source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the `rustyline` persistent history file.
    pub history_file: String,
    /// Index file opened automatically on CLI startup, if any.
    pub default_index: Option<PathBuf>,
    /// Log level passed to `env_logger` when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: DEFAULT_HISTORY_FILE.to_string(),
            default_index: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from `BTIDX_CONFIG` if set, else `./btidx.toml` if present, else
    /// built-in defaults.
    ///
    /// ## Error Conditions
    /// - `InvalidInput`: a config file exists at the resolved path but is not valid TOML for
    ///   this schema.
    pub fn load() -> IndexResult<Self> {
        let path = match env::var(CONFIG_ENV_VAR) {
            Ok(p) => Some(PathBuf::from(p)),
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                default_path.exists().then(|| default_path.to_path_buf())
            }
        };

        let Some(path) = path else {
            info!("no configuration file found, using built-in defaults");
            return Ok(Self::default());
        };

        Self::load_from(&path)
    }

    /// Loads configuration from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> IndexResult<Self> {
        if !path.exists() {
            info!("configuration file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| IndexError::InvalidInput {
            reason: format!("could not read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| IndexError::InvalidInput {
            reason: format!("malformed config file {}: {}", path.display(), e),
        })?;

        info!("loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.history_file, DEFAULT_HISTORY_FILE);
        assert!(config.default_index.is_none());
    }

    #[test]
    fn partial_toml_fills_in_remaining_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("btidx.toml");
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.history_file, DEFAULT_HISTORY_FILE);
    }

    #[test]
    fn malformed_toml_is_reported_not_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("btidx.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, IndexError::InvalidInput { .. }));
    }
}
