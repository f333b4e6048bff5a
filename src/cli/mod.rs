// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for freezerun.

pub mod build;
pub mod init;
pub mod plan;
pub mod release;
pub mod rewrite;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;
use std::path::{Path, PathBuf};

use crate::pipeline::{BuildConfig, DEFAULT_CONFIG_FILE};
use crate::process::CancelToken;

/// Reproducible single-executable builds of a Python project
#[derive(Parser, Debug)]
#[clap(
    name = "freezerun",
    version,
    about = "Freeze a Python project into a single reproducible executable",
    long_about = None,
    after_help = "Examples:\n\
        freezerun init                  Write a default .freezerun.yaml\n\
        freezerun plan                  Show the build stages\n\
        freezerun build                 Clone, provision and freeze\n\
        freezerun rewrite src/pkg       Rewrite relative imports in place\n\n\
        See 'freezerun <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Build configuration file
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the build
    Build {
        /// Show the stage plan without running anything
        #[clap(long)]
        dry_run: bool,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the ordered stage list
    Plan {
        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Rewrite package-relative imports under a directory
    Rewrite {
        /// Directory to rewrite in place
        dir: PathBuf,
    },

    /// Validate the build configuration
    Validate,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[clap(short, long)]
        force: bool,
    },

    /// Build, then publish the executable as a release
    ///
    /// Requires USERNAME, TOKEN and BUILD_VERSION in the environment.
    Release {
        /// Release notes (default: from configuration)
        #[clap(long)]
        notes: Option<String>,

        /// Create a draft release
        #[clap(long)]
        draft: bool,

        /// Mark the release as a prerelease
        #[clap(long)]
        prerelease: bool,
    },
}

/// Output format for build and plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Load the configuration named on the command line
pub(crate) fn load_config(path: &Path) -> Result<BuildConfig> {
    BuildConfig::load(path).map_err(miette::Report::new)
}

/// Cancellation token that fires on Ctrl-C
pub(crate) fn interrupt_token() -> CancelToken {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; stopping the running stage");
            trigger.cancel();
        }
    });
    cancel
}
