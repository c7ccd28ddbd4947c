// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use tr_cli::{Cli, CliConfig, Parser};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref())?;
    cli.logging.with_config_defaults(&config.logging).init("trajectory-replay")?;

    cli.command.run(&config.replayer).await
}
