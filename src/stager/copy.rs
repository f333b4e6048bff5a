// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Timestamp-pinned tree copy

use filetime::FileTime;
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{FreezeError, FreezeResult};

/// Path components that hold version-control metadata
pub const VCS_METADATA: &[&str] = &[".git", ".hg", ".svn", ".bzr"];

/// Whether a path component is version-control metadata
pub fn is_vcs_metadata(name: &OsStr) -> bool {
    name.to_str()
        .map(|n| VCS_METADATA.contains(&n))
        .unwrap_or(false)
}

/// What a copy produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// Copy `src` into `dst`, leaving out version-control metadata and setting
/// every copied file's modification time to `epoch` (seconds since the Unix
/// epoch).
///
/// The walk is pre-order, so each directory exists before its files are
/// copied. Directory times are pinned too, after everything below them has
/// been written.
pub fn copy_tree(src: &Path, dst: &Path, epoch: i64) -> FreezeResult<CopyStats> {
    let stamp = FileTime::from_unix_time(epoch, 0);
    let mut stats = CopyStats::default();
    let mut directories: Vec<PathBuf> = Vec::new();

    let walker = WalkDir::new(src)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_vcs_metadata(e.file_name()));

    for entry in walker {
        let entry = entry
            .map_err(|e| FreezeError::staging(format!("walking {}: {}", src.display(), e)))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| FreezeError::staging(e.to_string()))?;
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| copy_error("creating", &target, e))?;
            directories.push(target);
            stats.directories += 1;
            continue;
        }

        if file_type.is_symlink() {
            // Links are materialised as the file they point to.
            match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => {}
                _ => {
                    warn!(
                        path = %entry.path().display(),
                        "skipping symlink that is not a regular file"
                    );
                    stats.skipped += 1;
                    continue;
                }
            }
        }

        fs::copy(entry.path(), &target).map_err(|e| copy_error("copying to", &target, e))?;
        filetime::set_file_mtime(&target, stamp)
            .map_err(|e| copy_error("setting mtime on", &target, e))?;
        stats.files += 1;
    }

    for dir in directories.iter().rev() {
        if let Err(e) = filetime::set_file_mtime(dir, stamp) {
            debug!(dir = %dir.display(), error = %e, "could not pin directory mtime");
        }
    }

    Ok(stats)
}

fn copy_error(action: &str, path: &Path, e: std::io::Error) -> FreezeError {
    FreezeError::staging(format!("{} {}: {}", action, path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EPOCH: i64 = 315_532_800;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::create_dir_all(root.join("src/pkg/.svn")).unwrap();
        fs::write(root.join("src/pkg/.svn/entries"), "x").unwrap();
        fs::write(root.join("src/pkg/__init__.py"), "").unwrap();
        fs::write(root.join("src/pkg/main.py"), "print('hi')\n").unwrap();
        fs::write(root.join("setup.py"), "from setuptools import setup\n").unwrap();
        fs::write(root.join(".gitignore"), "dist/\n").unwrap();
        temp
    }

    #[test]
    fn test_vcs_names() {
        assert!(is_vcs_metadata(OsStr::new(".git")));
        assert!(is_vcs_metadata(OsStr::new(".hg")));
        assert!(!is_vcs_metadata(OsStr::new(".gitignore")));
        assert!(!is_vcs_metadata(OsStr::new("git")));
    }

    #[test]
    fn test_copy_skips_metadata_and_pins_mtime() {
        let src = fixture();
        let dst = TempDir::new().unwrap();
        let out = dst.path().join("build");

        let stats = copy_tree(src.path(), &out, EPOCH).unwrap();

        assert_eq!(stats.files, 4);
        assert!(out.join("src/pkg/main.py").is_file());
        assert!(out.join(".gitignore").is_file());
        assert!(!out.join(".git").exists());
        assert!(!out.join("src/pkg/.svn").exists());

        for entry in WalkDir::new(&out) {
            let entry = entry.unwrap();
            assert!(
                !entry.path().components().any(|c| is_vcs_metadata(c.as_os_str())),
                "metadata leaked: {}",
                entry.path().display()
            );
            if entry.file_type().is_file() {
                let meta = entry.metadata().unwrap();
                assert_eq!(
                    FileTime::from_last_modification_time(&meta).unix_seconds(),
                    EPOCH,
                    "unpinned: {}",
                    entry.path().display()
                );
            }
        }
    }

    #[test]
    fn test_copy_is_repeatable() {
        let src = fixture();
        let dst = TempDir::new().unwrap();

        let first = copy_tree(src.path(), &dst.path().join("a"), EPOCH).unwrap();
        let second = copy_tree(src.path(), &dst.path().join("b"), EPOCH).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            fs::read(dst.path().join("a/setup.py")).unwrap(),
            fs::read(dst.path().join("b/setup.py")).unwrap()
        );
    }
}
