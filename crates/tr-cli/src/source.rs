// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Mapping a SOURCE argument to a loader

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tr_loaders::{
    archive_stream, load_archive_file, load_directory, stream_file, stream_url, StreamOptions,
    TurnStream,
};
use tr_player::StreamingConfig;

/// Source flags shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Archive URL or path, NDJSON stream URL or file, or trajectory directory
    pub source: String,

    /// Read SOURCE as an NDJSON turn stream
    #[arg(long)]
    pub stream: bool,

    /// Do not delay between streamed turns
    #[arg(long)]
    pub no_pacing: bool,
}

impl SourceArgs {
    pub fn spec(&self) -> Result<SourceSpec> {
        SourceSpec::resolve(&self.source, self.stream)
    }

    pub fn stream_options(&self, config: &StreamingConfig) -> StreamOptions {
        if self.no_pacing {
            StreamOptions::unpaced()
        } else {
            config.into()
        }
    }

    pub async fn open(&self, config: &StreamingConfig) -> Result<TurnStream> {
        self.spec()?.open(self.stream_options(config)).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    ArchiveUrl(String),
    StreamUrl(String),
    ArchiveFile(PathBuf),
    Directory(PathBuf),
    StreamFile(PathBuf),
}

impl SourceSpec {
    /// URLs ending in `.zip` are archives and other URLs are NDJSON streams.
    /// Local `.zip` files are archives, directories are trajectory trees and
    /// any other file is read as NDJSON. `force_stream` makes every source an
    /// NDJSON stream.
    pub fn resolve(source: &str, force_stream: bool) -> Result<Self> {
        if is_url(source) {
            return Ok(if !force_stream && has_zip_extension(url_path(source)) {
                SourceSpec::ArchiveUrl(source.to_string())
            } else {
                SourceSpec::StreamUrl(source.to_string())
            });
        }

        let path = Path::new(source);
        if !path.exists() {
            bail!("source not found: {source}");
        }
        if path.is_dir() {
            if force_stream {
                bail!("--stream needs a file or URL, {source} is a directory");
            }
            return Ok(SourceSpec::Directory(path.to_path_buf()));
        }
        if !force_stream && has_zip_extension(source) {
            return Ok(SourceSpec::ArchiveFile(path.to_path_buf()));
        }
        Ok(SourceSpec::StreamFile(path.to_path_buf()))
    }

    pub async fn open(self, options: StreamOptions) -> Result<TurnStream> {
        tracing::info!(source = ?self, "opening source");
        let stream = match self {
            SourceSpec::ArchiveUrl(url) => archive_stream(http_client()?, url),
            SourceSpec::StreamUrl(url) => stream_url(http_client()?, url, options),
            SourceSpec::ArchiveFile(path) => {
                let turns = load_archive_file(&path)
                    .await
                    .with_context(|| format!("failed to load archive {}", path.display()))?;
                TurnStream::from_turns(turns)
            }
            SourceSpec::Directory(path) => {
                let turns = load_directory(&path)
                    .await
                    .with_context(|| format!("failed to load directory {}", path.display()))?;
                TurnStream::from_turns(turns)
            }
            SourceSpec::StreamFile(path) => stream_file(path, options),
        };
        Ok(stream)
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("trajectory-replay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// The URL without query or fragment.
fn url_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn has_zip_extension(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".zip")
}
