// Promstash - Shared-store metrics engine
// Copyright (C) 2026 Promstash Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! `promstash` command-line entry point

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use promstash_cli::commands::*;
use promstash_cli::{output, Session};
use promstash_config::ConfigLoader;
use promstash_observability::{init_tracing_with_config, LogConfig, LogFormat};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "promstash")]
#[command(version, about = "Prometheus metrics persisted in a shared key/value store")]
#[command(
    long_about = "promstash records counters, gauges, histograms and summaries into a shared store
so that any number of processes can update the same series and any one of them can collect."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect every series in the namespace
    Collect(CollectCmd),

    /// Increment a counter
    Inc(IncCmd),

    /// Set a gauge
    Set(SetCmd),

    /// Record a histogram observation
    Observe(ObserveCmd),

    /// Record a summary observation
    Summary(SummaryCmd),

    /// Delete every key in the namespace
    Wipe(WipeCmd),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color.as_str() {
        "never" => console::set_colors_enabled_stderr(false),
        "always" => console::set_colors_enabled_stderr(true),
        "auto" => {}
        _ => {
            output::error(&format!("Invalid color option: {}", cli.color));
            std::process::exit(2);
        }
    }

    if let Err(e) = run(cli).await {
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "promstash", &mut io::stdout());
        return Ok(());
    }

    let config = ConfigLoader::new()
        .load_or_default(cli.config.as_ref())
        .await
        .context("failed to load configuration")?;

    let format: LogFormat = config.observability.log_format.parse()?;
    let log_config = LogConfig::for_cli(&config.observability.log_level, cli.verbose, cli.quiet)
        .with_format(format)
        .with_color(console::colors_enabled_stderr());
    init_tracing_with_config(&log_config)?;

    let session = Session::open(config).await?;
    if !session.is_persistent() {
        output::warning("memory store: values are lost when this process exits");
    }

    match cli.command {
        Commands::Collect(cmd) => cmd.execute(&session).await,
        Commands::Inc(cmd) => cmd.execute(&session).await,
        Commands::Set(cmd) => cmd.execute(&session).await,
        Commands::Observe(cmd) => cmd.execute(&session).await,
        Commands::Summary(cmd) => cmd.execute(&session).await,
        Commands::Wipe(cmd) => cmd.execute(&session).await,
        Commands::Completions { .. } => Ok(()),
    }
}
