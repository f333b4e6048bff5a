// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Release command - build, then publish the executable

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{build, interrupt_token, plan};
use crate::errors::{FreezeError, RecoverySuggestion};
use crate::process::TokioProcessRunner;
use crate::publish::{GhCliPublisher, Publisher, ReleaseRequest, ReleaseSettings};

/// Run the release command
pub async fn run(
    config_path: PathBuf,
    notes: Option<String>,
    draft: bool,
    prerelease: bool,
    verbose: bool,
) -> Result<()> {
    // Credentials are checked before anything is built.
    let settings = match ReleaseSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            if let FreezeError::MissingEnv { ref name } = e {
                eprintln!("{}", RecoverySuggestion::export_release_env(name));
            }
            return Err(e.into());
        }
    };

    let pipeline = plan::pipeline(&config_path)?;
    let release = pipeline.config().release.clone();
    let repository = pipeline.config().release_repository();

    let cancel = interrupt_token();
    let (outcome, digest) = build::execute(pipeline, true, verbose, &cancel).await?;

    let request = ReleaseRequest {
        artifact: outcome.artifact,
        owner: settings.username,
        repository,
        tag: settings.version,
        notes: notes.unwrap_or(release.notes),
        draft: draft || release.draft,
        prerelease: prerelease || release.prerelease,
    };

    println!();
    println!(
        "{} {} to {}",
        "Publishing".bold(),
        request.tag.cyan(),
        request.slug().cyan()
    );

    let publisher = GhCliPublisher::new(Arc::new(TokioProcessRunner::new()), settings.token)
        .with_program(release.gh);
    publisher.publish(&request, &cancel).await?;

    println!("  {} Uploaded {}", "✓".green(), request.artifact.display());
    println!("  {} blake3 {}", "→".blue(), digest.hex);

    Ok(())
}
