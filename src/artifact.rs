// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Artifact digests
//!
//! Uses BLAKE3 so two builds of the same revision can be compared byte for
//! byte without shipping both executables around.

use blake3::Hasher;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::errors::{FreezeError, FreezeResult};

/// Extension of the digest file written next to an artifact
pub const DIGEST_EXTENSION: &str = "blake3";

/// Digest of a built executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDigest {
    pub path: PathBuf,
    pub size: u64,
    pub hex: String,
}

impl ArtifactDigest {
    /// Hash the file at `path`
    pub fn compute(path: &Path) -> FreezeResult<Self> {
        if !path.is_file() {
            return Err(FreezeError::NotFound {
                path: path.to_path_buf(),
                help: Some(
                    "The freeze stage finished but left no executable; check its output".into(),
                ),
            });
        }

        let read_err = |e: std::io::Error| FreezeError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        };

        let mut file = std::fs::File::open(path).map_err(read_err)?;
        let mut hasher = Hasher::new();
        let mut buf = [0u8; 64 * 1024];
        let mut size = 0u64;
        loop {
            let n = file.read(&mut buf).map_err(read_err)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }

        Ok(Self {
            path: path.to_path_buf(),
            size,
            hex: hasher.finalize().to_hex().to_string(),
        })
    }

    /// Sidecar file location: `<artifact>.blake3`
    pub fn sidecar_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(DIGEST_EXTENSION);
        PathBuf::from(name)
    }

    /// Write `<hex>  <file name>` next to the artifact
    pub fn write_sidecar(&self) -> FreezeResult<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let sidecar = self.sidecar_path();

        std::fs::write(&sidecar, format!("{}  {}\n", self.hex, file_name)).map_err(|e| {
            FreezeError::FileWriteError {
                path: sidecar.clone(),
                error: e.to_string(),
            }
        })?;

        Ok(sidecar)
    }
}
