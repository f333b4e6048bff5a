// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Rewrite command - run the import rewriter on its own

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::rewriter::rewrite_tree;

/// Run the rewrite command
pub async fn run(dir: PathBuf, verbose: bool) -> Result<()> {
    let report = rewrite_tree(&dir).await?;

    if verbose {
        for path in &report.rewritten {
            println!("  {} {}", "✓".green(), path.display());
        }
    }
    for failure in &report.failures {
        println!("  {} {}: {}", "✗".red(), failure.path.display(), failure.error);
    }

    println!(
        "Rewrote {} line{} in {} of {} files",
        report.lines_changed,
        if report.lines_changed == 1 { "" } else { "s" },
        report.rewritten.len(),
        report.scanned
    );

    if report.is_clean() {
        Ok(())
    } else {
        Err(miette::miette!("{} files could not be rewritten", report.failures.len()))
    }
}
