// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration file for the `trajectory-replay` binary.
//!
//! The replayer sections (`[playback]`, `[cursor]`, `[streaming]`) sit at
//! the top level next to a `[logging]` table.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tr_logging::LoggingConfig;
use tr_player::ReplayerConfig;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    #[serde(flatten)]
    pub replayer: ReplayerConfig,

    pub logging: LoggingConfig,
}

impl CliConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(contents).context("invalid configuration file")?;
        config.replayer.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else the user config file when it exists,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match user_config_path().filter(|path| path.is_file()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in {}", path.display()))
    }
}

/// `<config dir>/trajectory-replay/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("trajectory-replay").join(CONFIG_FILE))
}
