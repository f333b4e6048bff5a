// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Validate command - check the build configuration and tools

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_config;
use crate::errors::RecoverySuggestion;
use crate::pipeline::ConfigValidator;

/// Run the validate command
pub async fn run(config_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating configuration...".bold());
    println!();

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  {} Failed to load configuration", "✗".red());
            eprintln!();
            return Err(e);
        }
    };

    if config_path.exists() {
        println!("  {} {} parsed", "✓".green(), config_path.display());
    } else {
        println!("  {} No {}, using defaults", "→".blue(), config_path.display());
        for line in RecoverySuggestion::create_config().to_string().lines() {
            println!("    {}", line.dimmed());
        }
    }

    let paths = config.paths()?;
    let validation = ConfigValidator::validate(&config, &paths);

    let missing_tools: Vec<&str> = [config.interpreter.as_str(), config.git.as_str()]
        .into_iter()
        .filter(|tool| !tool.is_empty() && which::which(tool).is_err())
        .collect();

    let mut has_issues = false;

    if !validation.errors.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !missing_tools.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Missing tools".yellow().bold());
        for tool in &missing_tools {
            println!("  {} {}", "⚠".yellow(), tool);
            if verbose {
                for line in RecoverySuggestion::install_tool(tool).to_string().lines() {
                    println!("    {}", line.dimmed());
                }
            }
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Build summary".bold());
        println!("  Source: {}", config.source.url);
        println!("  Build root: {}", paths.staging_root.display());
        println!("  Scratch: {}", paths.scratch_dir.display());
        println!("  Epoch: {}", config.epoch);
        println!("  Artifact: {}", config.artifact_name());
    }

    println!();

    if validation.is_valid() {
        if has_issues || validation.has_warnings() {
            println!("{}", "Configuration is valid but has warnings.".yellow().bold());
        } else {
            println!("{}", "Configuration is valid!".green().bold());
        }
        Ok(())
    } else {
        Err(miette::miette!("Configuration validation failed"))
    }
}
