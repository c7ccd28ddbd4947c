// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Trajectory layout discovery shared by the archive and filesystem loaders
//!
//! A trajectory is laid out as `root/turn_<n>/.../<file>`. Both loaders
//! enumerate `/`-separated entry paths, locate the root, then feed each
//! file belonging to a turn folder into a [`TurnAssembler`].

use std::collections::BTreeMap;

use tr_domain_types::{Screenshot, Turn};

use crate::error::{LoadError, Result};
use crate::response::AgentResponse;

const TURN_PREFIX: &str = "turn_";
const AGENT_RESPONSE_SUFFIX: &str = "_agent_response.json";

/// What a file inside a turn folder contributes to its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnFile {
    Screenshot,
    AgentResponse,
    Other,
}

impl TurnFile {
    pub fn classify(file_name: &str) -> Self {
        if file_name.starts_with("screenshot_") && file_name.ends_with(".png") {
            TurnFile::Screenshot
        } else if file_name.ends_with(AGENT_RESPONSE_SUFFIX) {
            TurnFile::AgentResponse
        } else {
            TurnFile::Other
        }
    }
}

/// A file path resolved against the trajectory root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnEntry<'a> {
    /// The `turn_<n>` folder name.
    pub turn: &'a str,
    /// Last path segment.
    pub file_name: &'a str,
    pub kind: TurnFile,
}

impl<'a> TurnEntry<'a> {
    /// Resolve `path` against `root`. Paths with fewer than three segments,
    /// under another root, or outside a turn folder yield `None`.
    pub fn resolve(path: &'a str, root: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 3 || segments[0] != root || !segments[1].starts_with(TURN_PREFIX) {
            return None;
        }
        let file_name = segments[segments.len() - 1];
        if file_name.is_empty() {
            return None;
        }
        Some(Self {
            turn: segments[1],
            file_name,
            kind: TurnFile::classify(file_name),
        })
    }
}

/// Locate the trajectory root: the first segment of the first path whose
/// second segment is a turn folder.
pub fn find_trajectory_root<'a, I>(paths: I) -> Result<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen_any = false;
    for path in paths {
        seen_any = true;
        let mut segments = path.split('/');
        if let (Some(root), Some(turn)) = (segments.next(), segments.next()) {
            if turn.starts_with(TURN_PREFIX) {
                return Ok(root);
            }
        }
    }
    if seen_any {
        Err(LoadError::NoTrajectoryRoot)
    } else {
        Err(LoadError::EmptySource)
    }
}

/// The first run of digits in a turn folder name, or 0.
pub fn turn_index(turn_name: &str) -> u64 {
    turn_name
        .split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Groups discovered files into turns keyed by folder name.
#[derive(Debug, Default)]
pub struct TurnAssembler {
    turns: BTreeMap<String, Turn>,
}

impl TurnAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The turn for `turn_name`, created on first use.
    pub fn turn_mut(&mut self, turn_name: &str) -> &mut Turn {
        self.turns
            .entry(turn_name.to_string())
            .or_insert_with(|| Turn::new(turn_name, turn_index(turn_name)))
    }

    pub fn set_screenshot(&mut self, turn_name: &str, screenshot: Screenshot) {
        self.turn_mut(turn_name).screenshot = Some(screenshot);
    }

    pub fn apply_response(&mut self, turn_name: &str, response: AgentResponse) {
        let turn = self.turn_mut(turn_name);
        if let Some(thought) = response.thought.filter(|t| !t.is_empty()) {
            turn.thought = Some(thought);
        }
        turn.actions = response.actions;
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns sorted by index, ties broken by folder name.
    ///
    /// Folders such as `turn_1` and `turn_01` share an index; they are kept
    /// as separate turns in name order and the collision is logged.
    pub fn finish(self) -> Vec<Turn> {
        let mut turns: Vec<Turn> = self.turns.into_values().collect();
        turns.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
        for (index, ids) in shared_indices(&turns) {
            tracing::warn!(index, turns = ?ids, "turn folders share an index, ordering them by name");
        }
        turns
    }
}

/// Indices carried by more than one turn of a sorted sequence, with the ids
/// that carry them.
fn shared_indices(sorted: &[Turn]) -> Vec<(u64, Vec<&str>)> {
    let mut shared: Vec<(u64, Vec<&str>)> = Vec::new();
    for pair in sorted.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.index != b.index {
            continue;
        }
        match shared.last_mut() {
            Some((index, ids)) if *index == a.index => ids.push(b.id.as_str()),
            _ => shared.push((a.index, vec![a.id.as_str(), b.id.as_str()])),
        }
    }
    shared
}
