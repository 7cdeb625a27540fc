//! Copy execution with directory creation, invalid-name recovery and out-of-space cleanup

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::CopyError;

/// Filesystem writes performed by the executor
pub trait ByteCopier: Send + Sync {
    /// Moves the bytes of one file; returns the number of bytes written
    fn copy<'a>(&'a self, source: &'a Path, destination: &'a Path) -> BoxFuture<'a, io::Result<u64>>;

    /// Creates `dir` and any missing parents
    fn create_dir_all<'a>(&'a self, dir: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(fs::create_dir_all(dir))
    }
}

/// Default copier backed by `tokio::fs::copy`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCopier;

impl ByteCopier for TokioCopier {
    fn copy<'a>(&'a self, source: &'a Path, destination: &'a Path) -> BoxFuture<'a, io::Result<u64>> {
        Box::pin(fs::copy(source, destination))
    }
}

/// Result of a successful copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    /// Path relative to the destination root, sanitized if a retry was needed
    pub relative: PathBuf,
    pub bytes: u64,
}

/// Where a single attempt failed
enum AttemptError {
    Directory { path: PathBuf, source: io::Error },
    Copy(io::Error),
}

impl AttemptError {
    fn io(&self) -> &io::Error {
        match self {
            Self::Directory { source, .. } => source,
            Self::Copy(e) => e,
        }
    }
}

/// Executes copy decisions against the destination tree
#[derive(Clone)]
pub struct CopyExecutor {
    copier: Arc<dyn ByteCopier>,
    dry_run: bool,
}

impl CopyExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self::with_copier(Arc::new(TokioCopier), dry_run)
    }

    pub fn with_copier(copier: Arc<dyn ByteCopier>, dry_run: bool) -> Self {
        Self { copier, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Copy `source` to `dest_root/relative`, removing `replace` first
    ///
    /// Directory creation and file creation each get one retry with a
    /// sanitized relative path when the filesystem rejects the name.
    pub async fn copy(
        &self,
        source: &Path,
        dest_root: &Path,
        relative: &Path,
        replace: &[PathBuf],
    ) -> Result<CopyOutcome, CopyError> {
        if self.dry_run {
            let bytes = fs::metadata(source).await.map(|m| m.len()).unwrap_or(0);
            info!(
                "DRY RUN: would copy '{}' to '{}'",
                source.display(),
                dest_root.join(relative).display()
            );
            return Ok(CopyOutcome {
                relative: relative.to_path_buf(),
                bytes,
            });
        }

        for existing in replace {
            fs::remove_file(existing)
                .await
                .map_err(|source| CopyError::RemoveExisting {
                    path: existing.clone(),
                    source,
                })?;
            info!("Removed '{}'", existing.display());
        }

        let mut relative = relative.to_path_buf();
        let mut retried = false;
        loop {
            let destination = dest_root.join(&relative);
            match self.attempt(source, &destination).await {
                Ok(bytes) => {
                    preserve_times(source, &destination);
                    debug!("Copied {} bytes to '{}'", bytes, destination.display());
                    return Ok(CopyOutcome { relative, bytes });
                }
                Err(failure) => {
                    if !retried && is_invalid_name(failure.io()) {
                        let sanitized = sanitize_relative(&relative);
                        if sanitized != relative {
                            warn!(
                                "Invalid name '{}', retrying as '{}'",
                                relative.display(),
                                sanitized.display()
                            );
                            relative = sanitized;
                            retried = true;
                            continue;
                        }
                    }
                    return Err(self.classify(source, destination, failure).await);
                }
            }
        }
    }

    async fn attempt(&self, source: &Path, destination: &Path) -> Result<u64, AttemptError> {
        if let Some(parent) = destination.parent() {
            self.copier
                .create_dir_all(parent)
                .await
                .map_err(|source| AttemptError::Directory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        self.copier
            .copy(source, destination)
            .await
            .map_err(AttemptError::Copy)
    }

    async fn classify(&self, source: &Path, destination: PathBuf, failure: AttemptError) -> CopyError {
        match failure {
            AttemptError::Directory { path, source } => CopyError::CreateDirectory { path, source },
            AttemptError::Copy(e) if is_out_of_space(&e) => {
                if let Err(cleanup) = fs::remove_file(&destination).await {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!(
                            "Failed to remove partial file '{}': {}",
                            destination.display(),
                            cleanup
                        );
                    }
                }
                CopyError::OutOfSpace {
                    source_path: source.to_path_buf(),
                    destination,
                    source: e,
                }
            }
            AttemptError::Copy(e) => CopyError::Io {
                source_path: source.to_path_buf(),
                destination,
                source: e,
            },
        }
    }
}

impl Default for CopyExecutor {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Replace characters some filesystems refuse (`:` and `?`) with `-`
pub fn sanitize_relative(relative: &Path) -> PathBuf {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().replace([':', '?'], "-"))
        .collect()
}

/// Copy access and modification times; failure only warns
fn preserve_times(source: &Path, destination: &Path) {
    let metadata = match std::fs::metadata(source) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Failed to read times of '{}': {}", source.display(), e);
            return;
        }
    };

    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(e) = filetime::set_file_times(destination, atime, mtime) {
        warn!("Failed to preserve times on '{}': {}", destination.display(), e);
    }
}

#[cfg(unix)]
fn is_invalid_name(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EINVAL)
}

#[cfg(unix)]
fn is_out_of_space(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::ENOSPC)
}

// ERROR_INVALID_NAME
#[cfg(windows)]
fn is_invalid_name(e: &io::Error) -> bool {
    e.raw_os_error() == Some(123)
}

// ERROR_HANDLE_DISK_FULL, ERROR_DISK_FULL
#[cfg(windows)]
fn is_out_of_space(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(39) | Some(112))
}

#[cfg(not(any(unix, windows)))]
fn is_invalid_name(_: &io::Error) -> bool {
    false
}

#[cfg(not(any(unix, windows)))]
fn is_out_of_space(_: &io::Error) -> bool {
    false
}
