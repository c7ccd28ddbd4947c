// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Trajectory source loaders
//!
//! Every loader ends in either a sorted `Vec<Turn>` or a lazy [`TurnStream`]:
//!
//! - [`archive`]: `.zip` bytes, files and URLs
//! - [`filesystem`]: directory trees and explicit file selections
//! - [`streaming`]: NDJSON byte streams, URLs and files
//! - [`push`]: live sessions fed through a handle

pub mod archive;
pub mod discovery;
pub mod error;
pub mod filesystem;
mod http;
pub mod normalize;
pub mod push;
pub mod response;
pub mod source;
pub mod streaming;

pub use archive::{archive_stream, fetch_archive, load_archive_bytes, load_archive_file};
pub use error::{LoadError, Result};
pub use filesystem::{load_directory, load_selection, FileSelection, SelectedFile};
pub use normalize::normalize_action;
pub use push::{PushHandle, PushSource};
pub use response::{parse_agent_response, AgentResponse};
pub use source::TurnStream;
pub use streaming::{stream_file, stream_url, turns_from_byte_stream, LineBuffer, StreamOptions, TurnDecoder};
