// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Filesystem loader
//!
//! Works on a [`FileSelection`]: files paired with a `/`-separated path
//! relative to the parent of the picked folder, so the first segment of
//! every relative path is the picked folder's own name.

use std::io;
use std::path::{Path, PathBuf};

use tr_domain_types::{Screenshot, Turn};
use walkdir::WalkDir;

use crate::discovery::{find_trajectory_root, TurnAssembler, TurnEntry, TurnFile};
use crate::error::{LoadError, Result};
use crate::response::parse_agent_response;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub relative_path: String,
    pub path: PathBuf,
}

/// Files chosen for loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    pub entries: Vec<SelectedFile>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, relative_path: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.push(SelectedFile {
            relative_path: relative_path.into(),
            path: path.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select every regular file below `dir`, in file-name order.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = std::fs::canonicalize(dir.as_ref())?;
        let folder = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no folder name", dir.display()),
                )
            })?;

        let mut selection = Self::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&dir) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            selection.push(format!("{folder}/{relative}"), entry.path());
        }
        tracing::debug!(dir = %dir.display(), files = selection.len(), "selected trajectory files");
        Ok(selection)
    }
}

/// Build turns from a selection, sorted by index.
///
/// Screenshots are referenced by path rather than read. An agent response
/// that cannot be read leaves its turn without thought or actions.
pub async fn load_selection(selection: &FileSelection) -> Result<Vec<Turn>> {
    if selection.is_empty() {
        return Err(LoadError::EmptySource);
    }
    let root = find_trajectory_root(selection.entries.iter().map(|f| f.relative_path.as_str()))?;

    let mut assembler = TurnAssembler::new();
    for file in &selection.entries {
        let Some(entry) = TurnEntry::resolve(&file.relative_path, root) else {
            continue;
        };
        assembler.turn_mut(entry.turn);

        match entry.kind {
            TurnFile::Screenshot => {
                assembler.set_screenshot(entry.turn, Screenshot::path(file.path.clone()));
            }
            TurnFile::AgentResponse => match tokio::fs::read(&file.path).await {
                Ok(data) => assembler.apply_response(entry.turn, parse_agent_response(data)),
                Err(err) => {
                    tracing::warn!(
                        path = %file.path.display(),
                        error = %err,
                        "could not read agent response"
                    );
                }
            },
            TurnFile::Other => {}
        }
    }

    let turns = assembler.finish();
    tracing::info!(turns = turns.len(), root, "loaded trajectory from files");
    Ok(turns)
}

/// Walk `dir` and load it.
pub async fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<Turn>> {
    let dir = dir.as_ref().to_path_buf();
    let selection = tokio::task::spawn_blocking(move || FileSelection::from_directory(dir)).await??;
    load_selection(&selection).await
}
