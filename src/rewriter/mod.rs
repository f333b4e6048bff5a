// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Relative import rewriting
//!
//! PyInstaller analyses the entry script as a top-level module, so relative
//! imports inside the package cannot be resolved from it. This module turns
//! them into absolute imports, in place, across a package directory.

mod line;

pub use line::{rewrite_line, rewrite_source};

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::errors::{FreezeError, FreezeResult};

/// File extension the rewriter looks at
pub const SOURCE_EXTENSION: &str = "py";

/// A file that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct RewriteFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a rewrite pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteReport {
    /// Files discovered
    pub scanned: usize,
    /// Files written back
    pub rewritten: Vec<PathBuf>,
    /// Lines changed across all files
    pub lines_changed: usize,
    /// Files skipped because of an I/O or decoding error
    pub failures: Vec<RewriteFailure>,
}

impl RewriteReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Discover the source files under `root`, sorted for a stable order
pub fn discover_sources(root: &Path) -> FreezeResult<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = Path::new(&base)
        .join("**")
        .join(format!("*.{}", SOURCE_EXTENSION))
        .to_string_lossy()
        .to_string();

    let mut files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    Ok(files)
}

/// Rewrite relative imports in every source file under `root`.
///
/// A file is only written when at least one line changed, so untouched files
/// keep their modification time. Failures on individual files are logged and
/// collected in the report; they do not stop the pass.
pub async fn rewrite_tree(root: &Path) -> FreezeResult<RewriteReport> {
    if !root.is_dir() {
        error!(dir = %root.display(), "rewrite directory does not exist");
        return Err(FreezeError::NotFound {
            path: root.to_path_buf(),
            help: Some("Check `project.package_dir` in the build configuration".into()),
        });
    }

    let files = discover_sources(root)?;
    let mut report = RewriteReport {
        scanned: files.len(),
        ..RewriteReport::default()
    };

    for path in files {
        debug!(file = %path.display(), "processing");

        match rewrite_file(&path).await {
            Ok(Some(changed)) => {
                info!(file = %path.display(), lines = changed, "rewrote relative imports");
                report.lines_changed += changed;
                report.rewritten.push(path);
            }
            Ok(None) => debug!(file = %path.display(), "no changes needed"),
            Err(e) => {
                error!(file = %path.display(), error = %e, "failed to rewrite file; skipping");
                report.failures.push(RewriteFailure {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

async fn rewrite_file(path: &Path) -> FreezeResult<Option<usize>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FreezeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

    let Some((rewritten, changed)) = rewrite_source(&text) else {
        return Ok(None);
    };

    tokio::fs::write(path, rewritten)
        .await
        .map_err(|e| FreezeError::FileWriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

    Ok(Some(changed))
}
