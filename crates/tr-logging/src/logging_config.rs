// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging section of the replayer configuration file

use serde::{Deserialize, Serialize};

use crate::{CliLogLevel, LogFormat};

/// `[logging]` table of the configuration file. CLI flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub log_level: Option<CliLogLevel>,
    pub log_format: Option<LogFormat>,
    pub log_dir: Option<String>,
}
