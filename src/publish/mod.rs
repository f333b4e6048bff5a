// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Release publishing
//!
//! Uploads a built executable as a release asset. The build itself never
//! publishes; the `release` command runs a build and then hands the artifact
//! to a [`Publisher`].

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::errors::{FreezeError, FreezeResult};
use crate::process::{CancelToken, Invocation, ProcessRunner};

/// Variables the release command requires
pub const RELEASE_VARS: [&str; 3] = ["USERNAME", "TOKEN", "BUILD_VERSION"];

/// Credentials and version read from the environment
#[derive(Clone)]
pub struct ReleaseSettings {
    /// Account that owns the release repository
    pub username: String,
    pub token: String,
    /// Release tag
    pub version: String,
}

impl std::fmt::Debug for ReleaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseSettings")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("version", &self.version)
            .finish()
    }
}

impl ReleaseSettings {
    /// Read `USERNAME`, `TOKEN` and `BUILD_VERSION`.
    ///
    /// Fails on the first one that is unset or empty.
    pub fn from_env() -> FreezeResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup` instead of the process environment
    pub fn from_lookup<F>(lookup: F) -> FreezeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| FreezeError::MissingEnv { name: name.to_string() })
        };

        Ok(Self {
            username: require(RELEASE_VARS[0])?,
            token: require(RELEASE_VARS[1])?,
            version: require(RELEASE_VARS[2])?,
        })
    }
}

/// One release to create
#[derive(Debug, Clone)]
pub struct ReleaseRequest {
    pub artifact: PathBuf,
    pub owner: String,
    pub repository: String,
    pub tag: String,
    pub notes: String,
    pub draft: bool,
    pub prerelease: bool,
}

impl ReleaseRequest {
    /// `owner/repository`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repository)
    }
}

/// Trait for release backends
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create the release and upload the artifact
    async fn publish(&self, request: &ReleaseRequest, cancel: &CancelToken) -> FreezeResult<()>;
}

/// Publishes with the GitHub CLI (`gh release create`)
pub struct GhCliPublisher {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    token: String,
}

impl GhCliPublisher {
    pub fn new(runner: Arc<dyn ProcessRunner>, token: impl Into<String>) -> Self {
        Self {
            runner,
            program: "gh".to_string(),
            token: token.into(),
        }
    }

    /// Use a different `gh` executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn invocation(&self, request: &ReleaseRequest) -> Invocation {
        let mut invocation = Invocation::new(&self.program)
            .args(["release", "create"])
            .arg(&request.tag)
            .arg(request.artifact.to_string_lossy())
            .args(["--repo".to_string(), request.slug()])
            .args(["--title", request.tag.as_str()])
            .args(["--notes", request.notes.as_str()])
            .env("GH_TOKEN", &self.token);

        if request.draft {
            invocation = invocation.arg("--draft");
        }
        if request.prerelease {
            invocation = invocation.arg("--prerelease");
        }
        invocation
    }
}

#[async_trait]
impl Publisher for GhCliPublisher {
    async fn publish(&self, request: &ReleaseRequest, cancel: &CancelToken) -> FreezeResult<()> {
        if !request.artifact.is_file() {
            return Err(FreezeError::NotFound {
                path: request.artifact.clone(),
                help: Some("Build the artifact before publishing it".into()),
            });
        }

        info!(repo = %request.slug(), tag = %request.tag, "creating release");

        self.runner
            .run(&self.invocation(request), cancel)
            .await?
            .ensure_success(&self.program)?;

        info!(repo = %request.slug(), tag = %request.tag, "release published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::ScriptedRunner;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn request(artifact: PathBuf) -> ReleaseRequest {
        ReleaseRequest {
            artifact,
            owner: "octo".into(),
            repository: "whisper_ctranslate2".into(),
            tag: "v1.2.3".into(),
            notes: "Latest update".into(),
            draft: false,
            prerelease: true,
        }
    }

    #[test]
    fn test_settings_require_every_variable() {
        let settings = ReleaseSettings::from_lookup(lookup(&[
            ("USERNAME", "octo"),
            ("TOKEN", "secret"),
            ("BUILD_VERSION", "v1.2.3"),
        ]))
        .unwrap();
        assert_eq!(settings.version, "v1.2.3");
        assert!(!format!("{:?}", settings).contains("secret"));

        let err = ReleaseSettings::from_lookup(lookup(&[("USERNAME", "octo"), ("TOKEN", "")]))
            .unwrap_err();
        let FreezeError::MissingEnv { name } = err else {
            panic!("expected MissingEnv");
        };
        assert_eq!(name, "TOKEN");
    }

    #[tokio::test]
    async fn test_gh_release_command() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("tool");
        std::fs::write(&artifact, b"exe").unwrap();

        let runner = Arc::new(ScriptedRunner::new());
        let publisher = GhCliPublisher::new(runner.clone(), "secret");
        publisher
            .publish(&request(artifact.clone()), &CancelToken::new())
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "gh");
        assert_eq!(
            calls[0].args,
            vec![
                "release".to_string(),
                "create".to_string(),
                "v1.2.3".to_string(),
                artifact.to_string_lossy().to_string(),
                "--repo".to_string(),
                "octo/whisper_ctranslate2".to_string(),
                "--title".to_string(),
                "v1.2.3".to_string(),
                "--notes".to_string(),
                "Latest update".to_string(),
                "--prerelease".to_string(),
            ]
        );
        assert_eq!(calls[0].env["GH_TOKEN"], "secret");
    }

    #[tokio::test]
    async fn test_configured_gh_program() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("tool");
        std::fs::write(&artifact, b"exe").unwrap();

        let runner = Arc::new(ScriptedRunner::new());
        GhCliPublisher::new(runner.clone(), "t")
            .with_program("/usr/local/bin/gh")
            .publish(&request(artifact), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(runner.calls()[0].program, "/usr/local/bin/gh");
    }

    #[tokio::test]
    async fn test_gh_failure_is_non_zero_exit() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("tool");
        std::fs::write(&artifact, b"exe").unwrap();

        let runner = Arc::new(
            ScriptedRunner::new().respond("release create", 1, &["HTTP 422: tag exists"]),
        );
        let err = GhCliPublisher::new(runner, "t")
            .publish(&request(artifact), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FreezeError::NonZeroExit { code: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_missing_artifact_not_uploaded() {
        let runner = Arc::new(ScriptedRunner::new());
        let err = GhCliPublisher::new(runner.clone(), "t")
            .publish(&request(PathBuf::from("/nonexistent/tool")), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FreezeError::NotFound { .. }));
        assert!(runner.calls().is_empty());
    }
}
