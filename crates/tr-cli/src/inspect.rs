// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use clap::Args;
use tr_domain_types::Turn;
use tr_player::ReplayerConfig;

use crate::source::SourceArgs;

/// Print the normalized turns of a source as JSON
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl InspectArgs {
    pub async fn run(self, config: &ReplayerConfig) -> Result<()> {
        let turns = self.load(config).await?;
        println!("{}", serde_json::to_string_pretty(&turns)?);
        Ok(())
    }

    pub async fn load(&self, config: &ReplayerConfig) -> Result<Vec<Turn>> {
        let stream = self.source.open(&config.streaming).await?;
        let turns = stream
            .collect_turns()
            .await
            .with_context(|| format!("failed to load {}", self.source.source))?;
        tracing::info!(turns = turns.len(), "source inspected");
        Ok(turns)
    }
}
