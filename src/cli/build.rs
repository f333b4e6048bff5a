// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Build command - run the pipeline

use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;

use super::{interrupt_token, plan, OutputFormat};
use crate::artifact::ArtifactDigest;
use crate::pipeline::{BuildOutcome, BuildPipeline, ConfigValidator};
use crate::process::CancelToken;

#[derive(Serialize)]
struct BuildReport<'a> {
    #[serde(flatten)]
    outcome: &'a BuildOutcome,
    digest: &'a ArtifactDigest,
}

/// Run the build command
pub async fn run(
    config_path: PathBuf,
    dry_run: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let pipeline = plan::pipeline(&config_path)?;

    if dry_run {
        return plan::print_plan(&pipeline, format);
    }

    let text = format == OutputFormat::Text;
    let (outcome, digest) = execute(pipeline, text, verbose, &interrupt_token()).await?;

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}:", "Artifact".bold());
            println!("  {}", outcome.artifact.display());
            println!("  blake3 {}", digest.hex.cyan());
            if let Some(ref revision) = outcome.revision {
                println!("  {}", format!("from revision {}", revision).dimmed());
            }
        }
        OutputFormat::Json => {
            let report = BuildReport {
                outcome: &outcome,
                digest: &digest,
            };
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
    }

    Ok(())
}

/// Validate, run the pipeline and digest the artifact.
///
/// Shared by `build` and `release`.
pub(crate) async fn execute(
    pipeline: BuildPipeline,
    progress: bool,
    verbose: bool,
    cancel: &CancelToken,
) -> Result<(BuildOutcome, ArtifactDigest)> {
    let validation = ConfigValidator::validate(pipeline.config(), pipeline.paths());

    if !validation.is_valid() {
        eprintln!("{}", "Configuration validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Build configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Configuration warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let pipeline = pipeline.with_progress(progress);
    if progress {
        println!(
            "{} {}",
            "Building".bold(),
            pipeline.config().source.url.cyan()
        );
        println!();
    }

    let outcome = match pipeline.run(cancel).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => {
            eprintln!();
            eprintln!("{}", "Build cancelled".yellow().bold());
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    let digest = ArtifactDigest::compute(&outcome.artifact)?;
    let sidecar = digest.write_sidecar()?;
    tracing::info!(sidecar = %sidecar.display(), digest = %digest.hex, "wrote artifact digest");

    if progress {
        println!();
        println!(
            "{} in {:.2}s ({} stages)",
            "Build completed".green().bold(),
            outcome.duration_ms as f64 / 1000.0,
            outcome.stages.len()
        );
    }

    Ok((outcome, digest))
}
