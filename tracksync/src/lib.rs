//! Playlist Sync Library
//!
//! Copies the tracks named by a playlist into a destination tree named after
//! their tags, providing:
//! - Destination indexing with a reverse index by artist, album and title
//! - Pattern-driven destination naming with a local-root fallback
//! - Conflict detection and operator-driven resolution
//! - A free space check before copying
//! - Copying with invalid-name recovery and out-of-space handling
//! - Dry-run capabilities

pub mod capacity;
pub mod conflict;
pub mod decision;
pub mod error;
pub mod executor;
pub mod format;
pub mod index;
pub mod metadata;
pub mod naming;
pub mod playlist;
pub mod report;
pub mod sync_engine;

// Re-export main types and functions
pub use capacity::{CapacityDecision, CapacityGuard};
pub use conflict::{ConflictPolicy, ConflictResolver, SyncDecision};
pub use decision::{
    CapacityChoice, CapacityPrompt, ConflictChoice, ConflictPrompt, DecisionPort, FnDecisionPort,
    TerminalPort,
};
pub use error::{CopyError, MetadataError, NamingError, Result, SyncError};
pub use executor::{ByteCopier, CopyExecutor, CopyOutcome, TokioCopier};
pub use index::{DestinationIndex, DestinationIndexer, TrackKey};
pub use metadata::{ContainerFormat, LoftyExtractor, MetadataExtractor, TagRecord, Track, TrackTags};
pub use naming::{NamingPattern, PathBuilder, DEFAULT_PATTERN};
pub use playlist::PlaylistSet;
pub use report::{SyncReport, SyncStatus, TrackFailure};
pub use sync_engine::{SyncEngine, SyncOptions, SyncPhase};

/// Sync a playlist into a destination with the tag reader from `lofty`
pub async fn sync_playlist(
    playlist: impl AsRef<std::path::Path>,
    destination: impl AsRef<std::path::Path>,
    options: SyncOptions,
    port: &mut dyn DecisionPort,
) -> Result<SyncReport> {
    let engine = SyncEngine::new(options, std::sync::Arc::new(LoftyExtractor::new()));
    engine.run(playlist, destination, port).await
}

/// Read a playlist and size the files it names
pub async fn playlist_size(playlist: impl AsRef<std::path::Path>) -> Result<PlaylistSet> {
    PlaylistSet::read(playlist).await
}

// Test modules
#[cfg(test)]
mod testing;
#[cfg(test)]
mod path_property_tests;
