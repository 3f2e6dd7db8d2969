// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the gateway authors

//! Atomic whole-file JSON persistence: write to a sibling `.tmp`, fsync,
//! rename over the target, fsync the parent directory.
//!
//! Unlike a compressed background checkpoint, these files (credentials,
//! tunnels, pipeline runs) are meant to stay human-editable on disk, so
//! writes are synchronous, uncompressed JSON and happen on the caller's
//! thread at the moment state changes.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicFileError {
    #[error("I/O error at {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
    #[error("malformed JSON in {path}: {source}")]
    Json { path: String, #[source] source: serde_json::Error },
}

fn io_err(path: &Path, source: std::io::Error) -> AtomicFileError {
    AtomicFileError::Io { path: path.display().to_string(), source }
}

/// Read and deserialize `path`. Returns `Ok(None)` if the file doesn't exist
/// yet (first run).
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AtomicFileError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let value = serde_json::from_str(&contents)
                .map_err(|source| AtomicFileError::Json { path: path.display().to_string(), source })?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

/// Serialize `value` and atomically replace `path` with the result.
///
/// Write-tmp, fsync-file, rename, fsync-parent-dir: the rename is the only
/// step that can be observed mid-flight, and it's atomic on the filesystems
/// this gateway targets.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AtomicFileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp_path = tmp_path_for(path);
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|source| AtomicFileError::Json { path: path.display().to_string(), source })?;

    {
        let mut tmp = File::create(&tmp_path).map_err(|e| io_err(&tmp_path, e))?;
        tmp.write_all(&bytes).map_err(|e| io_err(&tmp_path, e))?;
        tmp.sync_all().map_err(|e| io_err(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;

    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tmp.into()
}
