// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Configuration validation
//!
//! Checks a build configuration before anything is cloned or installed.

use std::path::{Component, Path};

use super::environment::PINNED_VARS;
use super::{BuildConfig, BuildPaths, DEFAULT_EPOCH};

/// Build configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a configuration and the staging paths it resolves to
    pub fn validate(config: &BuildConfig, paths: &BuildPaths) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.source.url.trim().is_empty() {
            result.add_error("source.url is empty");
        }
        if config.interpreter.trim().is_empty() {
            result.add_error("interpreter is empty");
        }
        if config.git.trim().is_empty() {
            result.add_error("git is empty");
        }

        let project = [
            ("project.package_dir", &config.project.package_dir),
            ("project.entry_script", &config.project.entry_script),
            ("project.requirements", &config.project.requirements),
            ("project.setup_script", &config.project.setup_script),
        ];
        for (field, path) in project {
            Self::validate_project_path(field, path, &mut result);
        }

        if !config.project.entry_script.starts_with(&config.project.package_dir) {
            result.add_warning(&format!(
                "Entry script '{}' is outside package directory '{}'; \
                 its relative imports will not be rewritten",
                config.project.entry_script.display(),
                config.project.package_dir.display()
            ));
        }

        if paths.scratch_dir.starts_with(&paths.staging_root)
            || paths.staging_root.starts_with(&paths.scratch_dir)
        {
            result.add_error(&format!(
                "Scratch directory '{}' and build root '{}' overlap",
                paths.scratch_dir.display(),
                paths.staging_root.display()
            ));
        }
        if paths.staging_root.parent().is_none() || paths.scratch_dir.parent().is_none() {
            result.add_error("Staging paths must not be a filesystem root");
        }

        if config.epoch < DEFAULT_EPOCH {
            result.add_warning(&format!(
                "epoch {} is before 1980-01-01; wheel and zip timestamps will be clamped",
                config.epoch
            ));
        }

        for var in PINNED_VARS {
            if config.env.contains_key(*var) {
                result.add_warning(&format!("env.{} is set by the build and will be ignored", var));
            }
        }

        if let Some(ref key) = config.freeze.key {
            if key.len() != 16 {
                result.add_warning(
                    "freeze.key should be 16 characters; the freeze tool pads or truncates it",
                );
            }
        }

        result
    }

    fn validate_project_path(field: &str, path: &Path, result: &mut ValidationResult) {
        if path.as_os_str().is_empty() {
            result.add_error(&format!("{} is empty", field));
        } else if path.is_absolute() {
            result.add_error(&format!(
                "{} must be relative to the repository root, got '{}'",
                field,
                path.display()
            ));
        } else if path.components().any(|c| c == Component::ParentDir) {
            result.add_error(&format!("{} must stay inside the repository", field));
        }
    }
}

/// Result of configuration validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
