// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Replayer configuration
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [playback]
//! base-interval-ms = 2000
//! initial-speed = 1.5
//!
//! [streaming]
//! pacing-ms = 0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tr_loaders::StreamOptions;

use crate::animation::{ClickTiming, DragTiming};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReplayerConfig {
    pub playback: PlaybackConfig,
    pub cursor: CursorConfig,
    pub streaming: StreamingConfig,
}

/// Auto-advance timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlaybackConfig {
    /// Interval between turns at speed 1.0
    pub base_interval_ms: u64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub initial_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 2000,
            min_speed: 0.25,
            max_speed: 4.0,
            initial_speed: 1.0,
        }
    }
}

impl PlaybackConfig {
    pub fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if speed.is_nan() {
            return self.min_speed;
        }
        speed.clamp(self.min_speed, self.max_speed)
    }
}

/// Cursor animation timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CursorConfig {
    pub click_duration_ms: u64,
    pub click_min_scale: f64,
    /// Fire the scale callback a second time when progress lands in
    /// `[0.30, 0.32]`. Some presentations relied on that pulse.
    pub repeat_midpoint_callback: bool,
    pub drag_duration_ms: u64,
    /// How long `is_moving_cursor` stays set after a move
    pub move_indicator_ms: u64,
    /// Frame period of the runtime frame clock
    pub frame_interval_ms: u64,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            click_duration_ms: 300,
            click_min_scale: 0.5,
            repeat_midpoint_callback: false,
            drag_duration_ms: 500,
            move_indicator_ms: 100,
            frame_interval_ms: 16,
        }
    }
}

impl CursorConfig {
    pub fn click_timing(&self) -> ClickTiming {
        ClickTiming {
            duration_ms: self.click_duration_ms as f64,
            min_scale: self.click_min_scale,
            repeat_midpoint_callback: self.repeat_midpoint_callback,
        }
    }

    pub fn drag_timing(&self) -> DragTiming {
        DragTiming {
            duration_ms: self.drag_duration_ms as f64,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn move_indicator(&self) -> Duration {
        Duration::from_millis(self.move_indicator_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StreamingConfig {
    /// Delay after each streamed turn; 0 disables pacing
    pub pacing_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { pacing_ms: 100 }
    }
}

impl From<&StreamingConfig> for StreamOptions {
    fn from(config: &StreamingConfig) -> Self {
        StreamOptions {
            pacing: (config.pacing_ms > 0).then(|| Duration::from_millis(config.pacing_ms)),
        }
    }
}

impl ReplayerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ReplayerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let playback = &self.playback;
        if playback.base_interval_ms == 0 {
            return Err(invalid("playback.base-interval-ms must be positive"));
        }
        if !is_positive(playback.min_speed) || !playback.max_speed.is_finite() {
            return Err(invalid("playback speeds must be positive and finite"));
        }
        if playback.min_speed > playback.max_speed {
            return Err(ConfigError::Invalid(format!(
                "playback.min-speed ({}) exceeds playback.max-speed ({})",
                playback.min_speed, playback.max_speed
            )));
        }
        if !is_positive(playback.initial_speed) {
            return Err(invalid("playback.initial-speed must be positive"));
        }

        let cursor = &self.cursor;
        if cursor.click_duration_ms == 0 || cursor.drag_duration_ms == 0 {
            return Err(invalid("cursor animation durations must be positive"));
        }
        if cursor.frame_interval_ms == 0 {
            return Err(invalid("cursor.frame-interval-ms must be positive"));
        }
        if !is_positive(cursor.click_min_scale) || cursor.click_min_scale > 1.0 {
            return Err(invalid("cursor.click-min-scale must be in (0, 1]"));
        }

        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
