// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! freezerun - reproducible single-executable builds
//!
//! Clone a Python project, provision its dependencies and freeze it into one
//! executable with pinned timestamps and hash seeds.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freezerun::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "freezerun=debug" } else { "freezerun=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Build { dry_run, format } => {
            freezerun::cli::build::run(cli.config, dry_run, format, cli.verbose).await
        }
        Commands::Plan { format } => {
            freezerun::cli::plan::run(cli.config, format, cli.verbose).await
        }
        Commands::Rewrite { dir } => freezerun::cli::rewrite::run(dir, cli.verbose).await,
        Commands::Validate => freezerun::cli::validate::run(cli.config, cli.verbose).await,
        Commands::Init { force } => freezerun::cli::init::run(cli.config, force, cli.verbose).await,
        Commands::Release {
            notes,
            draft,
            prerelease,
        } => freezerun::cli::release::run(cli.config, notes, draft, prerelease, cli.verbose).await,
    }
}
