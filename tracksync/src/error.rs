//! Error types for the sync engine library

use std::io;
use std::path::PathBuf;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Run-level error type for sync operations
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Path-related errors
    #[error("Path error at '{}': {message}", .path.display())]
    Path { path: PathBuf, message: String },

    /// Naming pattern errors
    #[error("Invalid naming pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Playlist reading errors
    #[error("Playlist error at '{}': {message}", .path.display())]
    Playlist { path: PathBuf, message: String },

    /// Fatal copy errors (out of space is reported through the run status instead)
    #[error(transparent)]
    Copy(#[from] CopyError),

    /// The operator decision port failed to produce an answer
    #[error("Decision error: {0}")]
    Decision(String),
}

impl SyncError {
    /// Create a new path error
    pub fn path_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new pattern error
    pub fn pattern_error(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a new playlist error
    pub fn playlist_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Playlist {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new decision error
    pub fn decision_error(message: impl Into<String>) -> Self {
        Self::Decision(message.into())
    }
}

/// Tag extraction failures
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The extension does not name a container the extractor understands
    #[error("Unsupported container format for '{}'", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// The container was recognized but could not be parsed
    #[error("Failed to read tags from '{}': {message}", .path.display())]
    Read { path: PathBuf, message: String },
}

/// Destination path construction failures
#[derive(Debug, thiserror::Error)]
pub enum NamingError {
    /// Tags are incomplete and no configured local root contains the source
    #[error("No local root matches '{}' (roots: {roots:?})", .source_path.display())]
    NoLocalRootMatch {
        source_path: PathBuf,
        roots: Vec<PathBuf>,
    },

    /// The built path would leave the destination tree
    #[error("Destination path '{}' for '{}' leaves the destination", .relative.display(), .source_path.display())]
    OutsideDestination {
        source_path: PathBuf,
        relative: PathBuf,
    },
}

/// Copy execution failures
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    /// A file chosen for replacement could not be removed
    #[error("Failed to remove existing file '{}': {source}", .path.display())]
    RemoveExisting { path: PathBuf, source: io::Error },

    /// Parent directories could not be created, even after sanitizing
    #[error("Failed to create directory '{}': {source}", .path.display())]
    CreateDirectory { path: PathBuf, source: io::Error },

    /// The destination filled up during the copy
    #[error("No space left copying '{}' to '{}': {source}", .source_path.display(), .destination.display())]
    OutOfSpace {
        source_path: PathBuf,
        destination: PathBuf,
        source: io::Error,
    },

    /// Any other copy failure
    #[error("File copy error from '{}' to '{}': {source}", .source_path.display(), .destination.display())]
    Io {
        source_path: PathBuf,
        destination: PathBuf,
        source: io::Error,
    },
}

impl CopyError {
    /// Whether this failure must stop the remaining batch
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfSpace { .. } | Self::Io { .. })
    }
}
