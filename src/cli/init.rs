// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Init command - write a default configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::pipeline::{BuildConfig, DEFAULT_CONFIG_FILE};

/// Run the init command
pub async fn run(config_path: PathBuf, force: bool, verbose: bool) -> Result<()> {
    println!("{}", "Initializing freezerun configuration...".bold());
    println!();

    if config_path.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        ));
    }

    let content = render_default()?;

    std::fs::write(&config_path, &content).map_err(|e| {
        miette::miette!("Failed to write {}: {}", config_path.display(), e)
    })?;

    println!("  {} Created {}", "✓".green(), config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Point {} at the project to freeze", "source.url".cyan());
    println!("  2. Check the layout under {}", "project".cyan());
    println!("  3. Run {} to see the stages", "freezerun plan".cyan());
    println!("  4. Run {} to produce the executable", "freezerun build".cyan());
    println!();

    if verbose {
        println!("{}", "Generated configuration:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

fn render_default() -> Result<String> {
    let yaml = BuildConfig::default().to_yaml()?;
    Ok(format!(
        "# freezerun build configuration ({})\n\
         # Unset fields fall back to the defaults shown here.\n\
         # Staging paths default to the per-user cache directory.\n\n{}",
        DEFAULT_CONFIG_FILE, yaml
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_back() {
        let text = render_default().unwrap();
        assert!(text.starts_with("# freezerun"));
        assert_eq!(BuildConfig::from_yaml(&text).unwrap(), BuildConfig::default());
    }
}
