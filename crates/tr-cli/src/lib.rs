// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use clap::Subcommand;
use std::path::PathBuf;
use tr_logging::CliLoggingArgs;
use tr_player::ReplayerConfig;

pub mod config;
pub mod inspect;
pub mod play;
pub mod source;

pub use clap::Parser;
pub use config::CliConfig;

#[derive(clap::Parser, Debug)]
#[command(
    name = "trajectory-replay",
    about = "Replay recorded agent trajectories",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file (default: the user config file if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inspect(inspect::InspectArgs),
    Play(play::PlayArgs),
}

impl Commands {
    pub async fn run(self, config: &ReplayerConfig) -> anyhow::Result<()> {
        match self {
            Commands::Inspect(args) => args.run(config).await,
            Commands::Play(args) => args.run(config).await,
        }
    }
}
