// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Recorded UI actions

use serde::{Deserialize, Serialize};

/// Milliseconds on whatever timeline the recording used.
pub type Timestamp = f64;

/// Screen coordinates, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64);

impl Position {
    pub const ORIGIN: Position = Position(0.0, 0.0);

    pub fn new(x: f64, y: f64) -> Self {
        Self(x, y)
    }

    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }

    /// Linear interpolation towards `to`; `t = 0` is `self`, `t = 1` is `to`.
    pub fn lerp(self, to: Position, t: f64) -> Position {
        Position(self.0 + (to.0 - self.0) * t, self.1 + (to.1 - self.1) * t)
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyModifier {
    Ctrl,
    Alt,
    Shift,
    Meta,
}

impl KeyModifier {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ctrl" => Some(Self::Ctrl),
            "alt" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

/// One atomic recorded interaction.
///
/// The JSON form is tagged with a `type` field, e.g.
/// `{"type": "click", "position": [10, 20]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Click {
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Timestamp>,
    },
    Drag {
        from: Position,
        to: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Timestamp>,
    },
    Type {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Timestamp>,
    },
    Scroll {
        #[serde(default)]
        direction: ScrollDirection,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Timestamp>,
    },
    Key {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        modifiers: Option<Vec<KeyModifier>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<Timestamp>,
    },
}

impl Action {
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Action::Click { timestamp, .. }
            | Action::Drag { timestamp, .. }
            | Action::Type { timestamp, .. }
            | Action::Scroll { timestamp, .. }
            | Action::Key { timestamp, .. } => *timestamp,
        }
    }

    /// The discriminator used in the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::Drag { .. } => "drag",
            Action::Type { .. } => "type",
            Action::Scroll { .. } => "scroll",
            Action::Key { .. } => "key",
        }
    }
}
