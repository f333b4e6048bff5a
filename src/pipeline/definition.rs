// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Build configuration
//!
//! Defines the schema for .freezerun.yaml files. Every field has a default
//! describing the upstream project this tool was written for, so running
//! without a configuration file builds whisper-ctranslate2.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{FreezeError, FreezeResult};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".freezerun.yaml";

/// 1980-01-01T00:00:00Z, the earliest time a zip archive (and so a wheel)
/// can record
pub const DEFAULT_EPOCH: i64 = 315_532_800;

/// Build configuration from .freezerun.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Upstream repository
    pub source: SourceConfig,

    /// Python interpreter used to drive packaging
    pub interpreter: String,

    /// Git executable
    pub git: String,

    /// Where the build happens
    pub paths: PathsConfig,

    /// Layout of the upstream project
    pub project: ProjectConfig,

    /// Fixed timestamp (seconds since the Unix epoch) for files and
    /// SOURCE_DATE_EPOCH
    pub epoch: i64,

    /// Extra variables added to every process the build launches
    pub env: BTreeMap<String, String>,

    /// Dependency provisioning
    pub provision: ProvisionConfig,

    /// Freeze tool options
    pub freeze: FreezeConfig,

    /// Release publishing
    pub release: ReleaseConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            interpreter: default_interpreter(),
            git: "git".to_string(),
            paths: PathsConfig::default(),
            project: ProjectConfig::default(),
            epoch: DEFAULT_EPOCH,
            env: BTreeMap::new(),
            provision: ProvisionConfig::default(),
            freeze: FreezeConfig::default(),
            release: ReleaseConfig::default(),
        }
    }
}

fn default_interpreter() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}

/// Upstream source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Repository URL
    pub url: String,

    /// Branch or tag to clone (default branch when unset)
    pub branch: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://github.com/Softcatala/whisper-ctranslate2".to_string(),
            branch: None,
        }
    }
}

/// Staging locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Fixed build root (default: `<user cache dir>/build`)
    pub staging_root: Option<PathBuf>,

    /// Throwaway clone location (default: `<user cache dir>/scratch`)
    pub scratch_dir: Option<PathBuf>,
}

/// Upstream project layout, relative to the repository root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Package directory whose relative imports are rewritten
    pub package_dir: PathBuf,

    /// Script handed to the freeze tool
    pub entry_script: PathBuf,

    /// Requirements manifest
    pub requirements: PathBuf,

    /// Packaging entry point
    pub setup_script: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            package_dir: PathBuf::from("src/whisper_ctranslate2"),
            entry_script: PathBuf::from("src/whisper_ctranslate2/whisper_ctranslate2.py"),
            requirements: PathBuf::from("requirements.txt"),
            setup_script: PathBuf::from("setup.py"),
        }
    }
}

/// Dependency provisioning settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Run `pip-review --local --auto` to upgrade everything already installed
    pub upgrade_installed: bool,

    /// Let the update-check and diagnostics stages fail without aborting
    pub advisory_diagnostics: bool,
}

/// Freeze tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezeConfig {
    /// Artifact name (default: entry script stem)
    pub name: Option<String>,

    /// Fixed bytecode encryption key (`--key`, PyInstaller < 6)
    pub key: Option<String>,

    /// Disable UPX compression
    pub no_upx: bool,
}

/// Release settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Repository name under the publishing account (default: artifact name)
    pub repository: Option<String>,

    /// Release notes
    pub notes: String,

    pub draft: bool,

    pub prerelease: bool,

    /// GitHub CLI executable used to publish
    pub gh: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            repository: None,
            notes: "Latest update".to_string(),
            draft: false,
            prerelease: false,
            gh: "gh".to_string(),
        }
    }
}

/// Absolute staging locations for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPaths {
    pub staging_root: PathBuf,
    pub scratch_dir: PathBuf,
}

impl BuildConfig {
    /// Load configuration from a YAML or TOML file (by extension)
    pub fn from_file(path: &Path) -> FreezeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FreezeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Load `path`, falling back to defaults when it is the default file
    /// name and does not exist
    pub fn load(path: &Path) -> FreezeResult<Self> {
        if !path.exists() && path == Path::new(DEFAULT_CONFIG_FILE) {
            tracing::debug!("no {} found; using defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }
        if !path.exists() {
            return Err(FreezeError::NotFound {
                path: path.to_path_buf(),
                help: Some("Create one with 'freezerun init'".into()),
            });
        }
        Self::from_file(path)
    }

    /// Parse configuration from YAML
    pub fn from_yaml(yaml: &str) -> FreezeResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse configuration from TOML
    pub fn from_toml(text: &str) -> FreezeResult<Self> {
        toml::from_str(text).map_err(Into::into)
    }

    /// Serialize configuration to YAML
    pub fn to_yaml(&self) -> FreezeResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Resolve staging locations, relative paths against the current
    /// directory
    pub fn paths(&self) -> FreezeResult<BuildPaths> {
        let base = default_base_dir();
        let cwd = std::env::current_dir()?;
        let absolute = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) };

        Ok(BuildPaths {
            staging_root: self
                .paths
                .staging_root
                .as_deref()
                .map(absolute)
                .unwrap_or_else(|| base.join("build")),
            scratch_dir: self
                .paths
                .scratch_dir
                .as_deref()
                .map(absolute)
                .unwrap_or_else(|| base.join("scratch")),
        })
    }

    /// Name of the frozen executable, without extension
    pub fn artifact_name(&self) -> String {
        if let Some(ref name) = self.freeze.name {
            return name.clone();
        }
        self.project
            .entry_script
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "app".to_string())
    }

    /// Where the freeze tool leaves the executable
    pub fn artifact_path(&self, staging_root: &Path) -> PathBuf {
        staging_root
            .join("dist")
            .join(format!("{}{}", self.artifact_name(), std::env::consts::EXE_SUFFIX))
    }

    /// Repository name used when publishing
    pub fn release_repository(&self) -> String {
        self.release
            .repository
            .clone()
            .unwrap_or_else(|| self.artifact_name().to_lowercase())
    }
}

/// Stable per-user directory the default staging paths live under
pub fn default_base_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "freezerun")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("freezerun"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_describe_upstream() {
        let config = BuildConfig::default();
        assert_eq!(config.epoch, DEFAULT_EPOCH);
        assert_eq!(config.artifact_name(), "whisper_ctranslate2");
        assert_eq!(config.release_repository(), "whisper_ctranslate2");
        assert!(config.source.url.ends_with("whisper-ctranslate2"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
source:
  url: https://example.com/tool.git
  branch: v1.2.0
project:
  entry_script: src/tool/cli.py
paths:
  staging_root: /srv/build/tool
epoch: 1700000000
env:
  TZ: UTC
"#;
        let config = BuildConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.source.branch.as_deref(), Some("v1.2.0"));
        assert_eq!(config.epoch, 1_700_000_000);
        assert_eq!(config.env["TZ"], "UTC");
        assert_eq!(config.project.requirements, PathBuf::from("requirements.txt"));
        assert_eq!(config.artifact_name(), "cli");
        assert_eq!(
            config.artifact_path(Path::new("/srv/build/tool")),
            PathBuf::from(format!("/srv/build/tool/dist/cli{}", std::env::consts::EXE_SUFFIX))
        );
    }

    #[test]
    fn test_toml_config() {
        let text = r#"
interpreter = "/opt/python/bin/python3"

[freeze]
name = "wct2"
no_upx = true

[release]
gh = "/opt/gh/bin/gh"
"#;
        let config = BuildConfig::from_toml(text).unwrap();
        assert_eq!(config.interpreter, "/opt/python/bin/python3");
        assert_eq!(config.release.gh, "/opt/gh/bin/gh");
        assert_eq!(config.release.notes, "Latest update");
        assert_eq!(config.artifact_name(), "wct2");
        assert!(config.freeze.no_upx);
    }

    #[test]
    fn test_yaml_round_trip_of_defaults() {
        let config = BuildConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(BuildConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let mut config = BuildConfig::default();
        config.paths.staging_root = Some(PathBuf::from("work/build"));
        let paths = config.paths().unwrap();

        assert!(paths.staging_root.is_absolute());
        assert!(paths.staging_root.ends_with("work/build"));
        assert!(paths.scratch_dir.ends_with("scratch"));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let err = BuildConfig::load(Path::new("/nonexistent/freezerun.yaml")).unwrap_err();
        assert!(matches!(err, FreezeError::NotFound { .. }));
    }
}
