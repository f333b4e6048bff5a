// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Workspace staging
//!
//! Produces the directory the build runs in. In reproducible mode the
//! upstream repository is cloned into a throwaway scratch directory and then
//! copied, without version-control metadata and with pinned timestamps, into
//! a fixed build root so that embedded paths and times do not vary between
//! runs.

mod copy;

pub use copy::{copy_tree, is_vcs_metadata, CopyStats, VCS_METADATA};

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{FreezeError, FreezeResult, RecoverySuggestion};
use crate::process::{CancelToken, Invocation, ProcessRunner};

/// Trait for obtaining the upstream source tree
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Populate `dest` (which must not exist or be empty) with the source
    async fn fetch(&self, url: &str, dest: &Path, cancel: &CancelToken) -> FreezeResult<()>;

    /// Identify the fetched revision, if the source can tell
    async fn revision(&self, checkout: &Path, cancel: &CancelToken) -> FreezeResult<Option<String>>;
}

/// Fetches sources with `git clone`
pub struct GitFetcher {
    runner: Arc<dyn ProcessRunner>,
    git: String,
    branch: Option<String>,
}

impl GitFetcher {
    pub fn new(runner: Arc<dyn ProcessRunner>, git: impl Into<String>) -> Self {
        Self {
            runner,
            git: git.into(),
            branch: None,
        }
    }

    /// Clone a specific branch or tag instead of the default branch
    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }

    /// Map runner failures to staging errors; cancellation stays cancellation
    fn staging_error(&self, err: FreezeError) -> FreezeError {
        match err {
            FreezeError::Cancelled => FreezeError::Cancelled,
            FreezeError::Launch { error, .. } => FreezeError::Staging {
                message: format!("could not run '{}': {}", self.git, error),
                help: Some(RecoverySuggestion::install_tool(&self.git).to_string()),
            },
            FreezeError::NonZeroExit { code, tail, .. } => FreezeError::Staging {
                message: format!(
                    "'{} clone' exited with {}",
                    self.git,
                    code.map_or_else(|| "no status".to_string(), |c| c.to_string())
                ),
                help: (!tail.is_empty()).then_some(tail),
            },
            other => FreezeError::staging(other.to_string()),
        }
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, url: &str, dest: &Path, cancel: &CancelToken) -> FreezeResult<()> {
        let mut invocation = Invocation::new(&self.git).arg("clone");
        if let Some(ref branch) = self.branch {
            invocation = invocation.args(["--branch", branch.as_str()]);
        }
        let invocation = invocation
            .arg(url)
            .arg(dest.to_string_lossy())
            .env("GIT_TERMINAL_PROMPT", "0");

        self.runner
            .run(&invocation, cancel)
            .await
            .and_then(|out| out.ensure_success(&self.git))
            .map_err(|e| self.staging_error(e))?;

        Ok(())
    }

    async fn revision(
        &self,
        checkout: &Path,
        cancel: &CancelToken,
    ) -> FreezeResult<Option<String>> {
        let invocation = Invocation::new(&self.git)
            .args(["rev-parse", "HEAD"])
            .current_dir(checkout)
            .quiet();

        let out = self
            .runner
            .run(&invocation, cancel)
            .await
            .map_err(|e| self.staging_error(e))?;

        if !out.success() {
            debug!(dir = %checkout.display(), "could not resolve checkout revision");
            return Ok(None);
        }

        Ok(out.lines.first().map(|l| l.trim().to_string()))
    }
}

/// Result of reproducible staging
#[derive(Debug, Clone, Serialize)]
pub struct StagedWorkspace {
    /// Build root the pipeline works in
    pub root: PathBuf,
    /// Upstream revision that was staged
    pub revision: Option<String>,
    pub copy: CopyStats,
}

/// Materialises the build workspace
pub struct WorkspaceStager {
    fetcher: Arc<dyn SourceFetcher>,
}

impl WorkspaceStager {
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self { fetcher }
    }

    /// Clone `url` directly into `target`.
    ///
    /// `target` must be missing or empty.
    pub async fn stage(&self, url: &str, target: &Path, cancel: &CancelToken) -> FreezeResult<()> {
        if !is_empty_or_missing(target)? {
            return Err(FreezeError::Staging {
                message: format!("{} already exists and is not empty", target.display()),
                help: Some("Clone into an empty directory or remove the existing one".into()),
            });
        }

        info!(url, target = %target.display(), "cloning source");
        self.fetcher.fetch(url, target, cancel).await
    }

    /// Clone into `scratch`, then copy into `target` without version-control
    /// metadata and with every file's mtime pinned to `epoch`.
    ///
    /// Both directories are cleared first.
    pub async fn stage_reproducible(
        &self,
        url: &str,
        scratch: &Path,
        target: &Path,
        epoch: i64,
        cancel: &CancelToken,
    ) -> FreezeResult<StagedWorkspace> {
        check_disjoint(scratch, target)?;

        clear_dir(scratch).await?;
        if let Some(parent) = scratch.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| {
                    FreezeError::staging(format!("creating {}: {}", parent.display(), e))
                })?;
        }

        info!(url, scratch = %scratch.display(), "cloning source into scratch directory");
        self.fetcher.fetch(url, scratch, cancel).await?;
        let revision = self.fetcher.revision(scratch, cancel).await?;

        if cancel.is_cancelled() {
            return Err(FreezeError::Cancelled);
        }

        clear_dir(target).await?;

        let (src, dst) = (scratch.to_path_buf(), target.to_path_buf());
        let copy = tokio::task::spawn_blocking(move || copy_tree(&src, &dst, epoch))
            .await
            .map_err(|e| FreezeError::staging(format!("copy task failed: {}", e)))??;

        info!(
            target = %target.display(),
            files = copy.files,
            directories = copy.directories,
            revision = revision.as_deref().unwrap_or("unknown"),
            "staged workspace"
        );

        Ok(StagedWorkspace {
            root: target.to_path_buf(),
            revision,
            copy,
        })
    }
}

fn is_empty_or_missing(dir: &Path) -> FreezeResult<bool> {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(FreezeError::staging(format!("reading {}: {}", dir.display(), e))),
    }
}

/// Scratch and target are both wiped, so neither may contain the other.
fn check_disjoint(scratch: &Path, target: &Path) -> FreezeResult<()> {
    if scratch.parent().is_none() || target.parent().is_none() {
        return Err(FreezeError::staging("refusing to stage into a filesystem root"));
    }
    if scratch.starts_with(target) || target.starts_with(scratch) {
        return Err(FreezeError::Staging {
            message: format!(
                "scratch directory {} and build root {} overlap",
                scratch.display(),
                target.display()
            ),
            help: Some(
                "Point `paths.scratch_dir` and `paths.staging_root` at separate directories".into(),
            ),
        });
    }
    Ok(())
}

async fn clear_dir(dir: &Path) -> FreezeResult<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!(dir = %dir.display(), "cleared directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FreezeError::staging(format!("clearing {}: {}", dir.display(), e))),
    }
}

/// Fetcher that copies a local directory; stands in for git in tests
#[cfg(test)]
pub(crate) struct DirectoryFetcher {
    pub(crate) source: PathBuf,
}

#[cfg(test)]
#[async_trait]
impl SourceFetcher for DirectoryFetcher {
    async fn fetch(&self, _url: &str, dest: &Path, cancel: &CancelToken) -> FreezeResult<()> {
        if cancel.is_cancelled() {
            return Err(FreezeError::Cancelled);
        }
        // Keep metadata in the "clone" so the copy step has something to drop.
        fn copy_all(from: &Path, to: &Path) -> std::io::Result<()> {
            std::fs::create_dir_all(to)?;
            for entry in std::fs::read_dir(from)? {
                let entry = entry?;
                let dest = to.join(entry.file_name());
                if entry.file_type()?.is_dir() {
                    copy_all(&entry.path(), &dest)?;
                } else {
                    std::fs::copy(entry.path(), dest)?;
                }
            }
            Ok(())
        }
        copy_all(&self.source, dest).map_err(|e| FreezeError::staging(e.to_string()))
    }

    async fn revision(
        &self,
        _checkout: &Path,
        _cancel: &CancelToken,
    ) -> FreezeResult<Option<String>> {
        Ok(Some("0000000000000000000000000000000000000000".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::ScriptedRunner;
    use filetime::FileTime;
    use std::fs;
    use tempfile::TempDir;

    const EPOCH: i64 = 315_532_800;

    fn upstream() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/config"), "[core]\n").unwrap();
        fs::create_dir_all(temp.path().join("src/pkg")).unwrap();
        fs::write(temp.path().join("src/pkg/app.py"), "from .core import run\n").unwrap();
        temp
    }

    #[tokio::test]
    async fn test_reproducible_staging() {
        let source = upstream();
        let work = TempDir::new().unwrap();
        let scratch = work.path().join("scratch");
        let target = work.path().join("build");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), "old").unwrap();

        let stager = WorkspaceStager::new(Arc::new(DirectoryFetcher {
            source: source.path().to_path_buf(),
        }));
        let staged = stager
            .stage_reproducible("unused", &scratch, &target, EPOCH, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(staged.root, target);
        assert!(staged.revision.is_some());
        assert!(!target.join("stale.txt").exists());
        assert!(!target.join(".git").exists());
        assert!(scratch.join(".git").exists());

        let meta = fs::metadata(target.join("src/pkg/app.py")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta).unix_seconds(), EPOCH);
    }

    #[tokio::test]
    async fn test_simple_stage_rejects_non_empty_target() {
        let work = TempDir::new().unwrap();
        fs::write(work.path().join("occupied"), "x").unwrap();

        let stager = WorkspaceStager::new(Arc::new(DirectoryFetcher {
            source: upstream().path().to_path_buf(),
        }));
        let err = stager
            .stage("unused", work.path(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FreezeError::Staging { .. }));
    }

    #[tokio::test]
    async fn test_overlapping_paths_rejected() {
        let work = TempDir::new().unwrap();
        let stager = WorkspaceStager::new(Arc::new(DirectoryFetcher {
            source: work.path().to_path_buf(),
        }));
        let err = stager
            .stage_reproducible(
                "unused",
                &work.path().join("build/scratch"),
                &work.path().join("build"),
                EPOCH,
                &CancelToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FreezeError::Staging { .. }));
    }

    #[tokio::test]
    async fn test_git_fetcher_builds_clone_command() {
        let runner = Arc::new(ScriptedRunner::new());
        let fetcher = GitFetcher::new(runner.clone(), "git").with_branch(Some("v0.4".into()));

        fetcher
            .fetch("https://example.com/repo", Path::new("/tmp/scratch"), &CancelToken::new())
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec!["clone", "--branch", "v0.4", "https://example.com/repo", "/tmp/scratch"]
        );
        assert_eq!(calls[0].env["GIT_TERMINAL_PROMPT"], "0");
    }

    #[tokio::test]
    async fn test_git_failures_become_staging_errors() {
        let runner = Arc::new(
            ScriptedRunner::new().respond("clone", 128, &["fatal: repository not found"]),
        );
        let fetcher = GitFetcher::new(runner, "git");
        let err = fetcher
            .fetch("https://example.com/missing", Path::new("/tmp/x"), &CancelToken::new())
            .await
            .unwrap_err();

        let FreezeError::Staging { message, help } = err else {
            panic!("expected Staging");
        };
        assert!(message.contains("128"));
        assert!(help.unwrap().contains("repository not found"));

        let missing = Arc::new(ScriptedRunner::new().fail_launch("clone"));
        let err = GitFetcher::new(missing, "git")
            .fetch("u", Path::new("/tmp/x"), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FreezeError::Staging { .. }));
    }

    #[tokio::test]
    async fn test_git_revision() {
        let runner = Arc::new(ScriptedRunner::new().respond("rev-parse", 0, &["abc123"]));
        let fetcher = GitFetcher::new(runner, "git");
        let rev = fetcher.revision(Path::new("."), &CancelToken::new()).await.unwrap();
        assert_eq!(rev.as_deref(), Some("abc123"));
    }
}
