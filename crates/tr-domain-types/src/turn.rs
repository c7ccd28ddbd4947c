// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Turns and turn-sequence metadata

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::action::{Action, Timestamp};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    User,
    System,
    #[default]
    Assistant,
}

/// Opaque reference to the screen captured for a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Screenshot {
    /// Image file on the local filesystem.
    Path { path: PathBuf },
    /// URL or data URI supplied by a remote producer.
    Uri { uri: String },
    /// Image bytes extracted from an archive entry.
    Embedded {
        name: String,
        #[serde(skip)]
        data: Arc<[u8]>,
    },
}

impl Screenshot {
    pub fn uri(uri: impl Into<String>) -> Self {
        Self::Uri { uri: uri.into() }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }

    pub fn embedded(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self::Embedded {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// One step of a recorded agent session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    #[serde(rename = "type")]
    pub kind: TurnKind,
    pub id: String,
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Screenshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Turn {
    /// An assistant turn with no content yet.
    pub fn new(id: impl Into<String>, index: u64) -> Self {
        Self {
            kind: TurnKind::Assistant,
            id: id.into(),
            index,
            timestamp: None,
            screenshot: None,
            thought: None,
            actions: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_kind(mut self, kind: TurnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }
}

/// Completion metadata for a turn sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnsMetadata {
    /// Total number of turns the producer expects to yield, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<usize>,
    /// Whether the producer will yield no further turns.
    #[serde(default = "default_done")]
    pub done: bool,
    /// Whether `total_count` is an estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated: Option<bool>,
}

fn default_done() -> bool {
    true
}

impl Default for TurnsMetadata {
    fn default() -> Self {
        Self {
            total_count: None,
            done: true,
            estimated: None,
        }
    }
}

impl TurnsMetadata {
    /// Metadata for a producer that may still yield turns.
    pub fn open() -> Self {
        Self {
            done: false,
            ..Self::default()
        }
    }

    /// Shallow merge: fields present in `update` replace ours.
    pub fn merge(&mut self, update: TurnsMetadataUpdate) {
        if let Some(total_count) = update.total_count {
            self.total_count = Some(total_count);
        }
        if let Some(done) = update.done {
            self.done = done;
        }
        if let Some(estimated) = update.estimated {
            self.estimated = Some(estimated);
        }
    }
}

/// Partial [`TurnsMetadata`] used for shallow merges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TurnsMetadataUpdate {
    pub total_count: Option<usize>,
    pub done: Option<bool>,
    pub estimated: Option<bool>,
}

impl TurnsMetadataUpdate {
    pub fn done(done: bool) -> Self {
        Self {
            done: Some(done),
            ..Self::default()
        }
    }
}
