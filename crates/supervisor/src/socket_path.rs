// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket Path Resolver (C2).
//!
//! Unix domain socket paths are capped at a small, platform-specific number
//! of bytes (107 on Linux, 103 on macOS). A deeply-nested `baseDir` can blow
//! that budget; rather than let `bind` fail with an opaque `ENAMETOOLONG`,
//! fall back to a short, content-addressed directory under `/tmp`.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Conservative ceiling under every platform's real limit.
const PATH_LEN_CEILING: usize = 100;

/// Resolves a socket file name against `base_dir`, falling back to a short
/// hashed directory under `/tmp` when the joined path would be too long.
pub struct SocketPathResolver {
    base_dir: PathBuf,
}

impl SocketPathResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Produce a socket path for `file_name`, ensuring any fallback short
    /// directory exists on disk (0o755). Does not create `base_dir` itself;
    /// callers create it separately (spec.md §4.3/§4.4 step 1).
    pub fn resolve(&self, file_name: &str) -> std::io::Result<PathBuf> {
        let candidate = self.base_dir.join(file_name);
        if candidate.as_os_str().len() < PATH_LEN_CEILING {
            return Ok(candidate);
        }

        let short_dir = short_dir_for(&self.base_dir);
        create_dir_0755(&short_dir)?;
        Ok(short_dir.join(file_name))
    }
}

/// Deterministic short directory for a given base directory: `/tmp/iota-ae-<hash12>`.
fn short_dir_for(base_dir: &Path) -> PathBuf {
    let digest = Sha256::digest(base_dir.as_os_str().as_encoded_bytes());
    let hash = format!("{digest:x}");
    PathBuf::from(format!("/tmp/iota-ae-{}", &hash[..12]))
}

#[cfg(unix)]
fn create_dir_0755(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::create_dir_all(dir)?;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn create_dir_0755(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Ensure `dir` exists with 0o755 permissions (spec.md §4.3/§4.4 step 1).
pub fn ensure_base_dir(dir: &Path) -> std::io::Result<()> {
    create_dir_0755(dir)
}

/// Remove a stale socket file left behind by a prior crash, if any. Missing
/// files are not an error.
pub fn remove_stale_socket(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "socket_path_tests.rs"]
mod tests;
