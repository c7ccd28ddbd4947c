// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use futures::stream::{self, BoxStream, StreamExt};
use tr_domain_types::{Turn, TurnsMetadata};

use crate::error::Result;

/// A lazy, single-consumer producer of turns together with the metadata
/// known before the first item is pulled.
pub struct TurnStream {
    pub turns: BoxStream<'static, Result<Turn>>,
    pub metadata: TurnsMetadata,
}

impl TurnStream {
    pub fn new(turns: BoxStream<'static, Result<Turn>>, metadata: TurnsMetadata) -> Self {
        Self { turns, metadata }
    }

    /// A finished stream over already materialized turns.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        let metadata = TurnsMetadata {
            total_count: Some(turns.len()),
            ..TurnsMetadata::default()
        };
        Self::new(stream::iter(turns.into_iter().map(Ok)).boxed(), metadata)
    }

    /// Drain the stream, stopping at the first error.
    pub async fn collect_turns(mut self) -> Result<Vec<Turn>> {
        let mut turns = Vec::new();
        while let Some(turn) = self.turns.next().await {
            turns.push(turn?);
        }
        Ok(turns)
    }
}

impl std::fmt::Debug for TurnStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnStream").field("metadata", &self.metadata).finish_non_exhaustive()
    }
}
