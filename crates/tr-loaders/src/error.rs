// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

/// Convenient result alias for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failures that abort a whole load.
///
/// Problems confined to one item (an unparseable agent response, a dropped
/// action, a malformed stream line) are logged instead and never show up here.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source contained no entries at all.
    #[error("Source is empty")]
    EmptySource,

    /// No `<root>/turn_<n>/` layout could be found among the entries.
    #[error("Could not find valid trajectory folder with turn_XXX subfolders")]
    NoTrajectoryRoot,

    /// The server answered with a non-success status.
    #[error("Failed to fetch {url}: {status} {reason}")]
    Fetch {
        url: String,
        status: u16,
        reason: String,
    },

    /// Transport-level HTTP failure, including errors while reading a body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The archive container could not be opened or read.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A background extraction task panicked or was cancelled.
    #[error("Loader task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for LoadError {
    fn from(err: tokio::task::JoinError) -> Self {
        LoadError::Task(err.to_string())
    }
}
