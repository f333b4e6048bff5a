// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest installing a missing tool
    pub fn install_tool(tool: &str) -> Self {
        let name = std::path::Path::new(tool)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(tool);

        match name {
            "python" | "python3" | "py" => Self {
                action: "Install Python".into(),
                steps: vec![
                    "A Python interpreter is required to package the upstream project".into(),
                    "Install it, or point `interpreter:` in .freezerun.yaml at an existing one"
                        .into(),
                ],
                commands: vec![
                    "# Check what is on PATH:".into(),
                    format!("{} --version", tool),
                ],
            },
            "git" => Self {
                action: "Install Git".into(),
                steps: vec!["Git is required to clone the upstream repository".into()],
                commands: vec![
                    "# Debian/Ubuntu:".into(),
                    "apt-get install git".into(),
                    "".into(),
                    "# Windows:".into(),
                    "winget install Git.Git".into(),
                ],
            },
            "gh" => Self {
                action: "Install the GitHub CLI".into(),
                steps: vec!["The release command publishes through `gh release create`".into()],
                commands: vec!["# See https://cli.github.com/".into()],
            },
            _ => Self {
                action: format!("Install {}", tool),
                steps: vec![format!("Install {} and ensure it's in your PATH", tool)],
                commands: vec![],
            },
        }
    }

    /// Suggest creating a configuration file
    pub fn create_config() -> Self {
        Self {
            action: "Create a build configuration".into(),
            steps: vec![
                "No .freezerun.yaml found; built-in defaults will be used".into(),
                "Write the defaults out to customise paths or the upstream project".into(),
            ],
            commands: vec!["freezerun init".into()],
        }
    }

    /// Suggest exporting the variables the release command needs
    pub fn export_release_env(missing: &str) -> Self {
        Self {
            action: format!("Export {}", missing),
            steps: vec![
                "The release command reads USERNAME, TOKEN and BUILD_VERSION".into(),
                "All three must be set and non-empty".into(),
            ],
            commands: vec![format!("export {}=...", missing)],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_tool_matches_full_path() {
        let suggestion = RecoverySuggestion::install_tool("/usr/bin/python3");
        assert_eq!(suggestion.action, "Install Python");
    }

    #[test]
    fn test_display_lists_commands() {
        let text = RecoverySuggestion::export_release_env("TOKEN").to_string();
        assert!(text.starts_with("→ Export TOKEN"));
        assert!(text.contains("export TOKEN=..."));
    }

    #[test]
    fn test_create_config_points_at_init() {
        let text = RecoverySuggestion::create_config().to_string();
        assert!(text.contains(".freezerun.yaml"));
        assert!(text.ends_with("  freezerun init\n"));
    }
}
