// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Archive loader
//!
//! Reads a `.zip` holding one trajectory (`root/turn_<n>/...`) from memory,
//! from disk, or over HTTP. Decompression always happens on the blocking
//! pool when called from async code.

use std::io::{Cursor, Read};
use std::path::Path;

use futures::StreamExt;
use tr_domain_types::{Screenshot, Turn, TurnsMetadata};
use zip::ZipArchive;

use crate::discovery::{find_trajectory_root, TurnAssembler, TurnEntry, TurnFile};
use crate::error::{LoadError, Result};
use crate::http::get_checked;
use crate::response::parse_agent_response;
use crate::source::TurnStream;

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: usize = 8 * 1024 * 1024;

/// Decode an in-memory archive into turns sorted by index.
///
/// This is synchronous and CPU bound; async callers should prefer
/// [`load_archive_file`] or [`fetch_archive`], which move the work onto the
/// blocking pool.
pub fn load_archive_bytes(bytes: Vec<u8>) -> Result<Vec<Turn>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    if archive.len() == 0 {
        return Err(LoadError::EmptySource);
    }

    // Central directory order, so "first turn path" is deterministic.
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    let root = find_trajectory_root(names.iter().map(String::as_str))?.to_string();
    tracing::debug!(root = %root, entries = names.len(), "found trajectory root in archive");

    let mut assembler = TurnAssembler::new();
    for (i, name) in names.iter().enumerate() {
        let Some(entry) = TurnEntry::resolve(name, &root) else {
            continue;
        };
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        assembler.turn_mut(entry.turn);

        match entry.kind {
            TurnFile::Screenshot => {
                let mut data = Vec::with_capacity(capacity_hint(file.size()));
                file.read_to_end(&mut data)?;
                assembler.set_screenshot(entry.turn, Screenshot::embedded(name.as_str(), data));
            }
            TurnFile::AgentResponse => {
                let mut data = Vec::with_capacity(capacity_hint(file.size()));
                match file.read_to_end(&mut data) {
                    Ok(_) => assembler.apply_response(entry.turn, parse_agent_response(&data)),
                    Err(err) => {
                        tracing::warn!(entry = %name, error = %err, "could not read agent response");
                    }
                }
            }
            TurnFile::Other => {}
        }
    }

    let turns = assembler.finish();
    tracing::info!(turns = turns.len(), "loaded trajectory archive");
    Ok(turns)
}

/// Read and decode a `.zip` file from disk.
pub async fn load_archive_file(path: impl AsRef<Path>) -> Result<Vec<Turn>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    decode_on_blocking_pool(bytes).await
}

/// Fetch a `.zip` over HTTP and decode it.
pub async fn fetch_archive(client: &reqwest::Client, url: &str) -> Result<Vec<Turn>> {
    let response = get_checked(client, url).await?;
    let bytes = response.bytes().await?;
    decode_on_blocking_pool(bytes.to_vec()).await
}

/// A lazy stream over a remote archive; nothing is fetched until the first
/// poll. The archive is complete by nature, so `done` is already true.
pub fn archive_stream(client: reqwest::Client, url: impl Into<String>) -> TurnStream {
    let url = url.into();
    let turns = async_stream::try_stream! {
        for turn in fetch_archive(&client, &url).await? {
            yield turn;
        }
    };
    TurnStream::new(turns.boxed(), TurnsMetadata::default())
}

/// Buffer size to reserve for an entry whose header declares `declared`
/// bytes. Headers are untrusted, so the hint is capped.
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(MAX_PREALLOCATION)
}

async fn decode_on_blocking_pool(bytes: Vec<u8>) -> Result<Vec<Turn>> {
    tokio::task::spawn_blocking(move || load_archive_bytes(bytes)).await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_entry_size_is_capped() {
        assert_eq!(capacity_hint(1024), 1024);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOCATION);
        assert_eq!(capacity_hint(MAX_PREALLOCATION as u64 + 1), MAX_PREALLOCATION);
    }
}
