//! Main sync engine that orchestrates a playlist sync

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::capacity::{CapacityDecision, CapacityGuard};
use crate::conflict::{ConflictPolicy, ConflictResolver, SyncDecision};
use crate::decision::DecisionPort;
use crate::error::{CopyError, Result, SyncError};
use crate::executor::{ByteCopier, CopyExecutor};
use crate::index::{DestinationIndex, DestinationIndexer};
use crate::metadata::{MetadataExtractor, Track};
use crate::naming::{NamingPattern, PathBuilder};
use crate::playlist::PlaylistSet;
use crate::report::{SyncReport, SyncStatus};

/// Options for sync operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Destination naming pattern
    #[serde(with = "pattern_string")]
    pub pattern: NamingPattern,
    /// Library roots used to name tracks with incomplete tags
    pub local_roots: Vec<PathBuf>,
    /// How tracks already present at the destination are handled
    pub conflict_policy: ConflictPolicy,
    /// Decide and report without touching the destination
    pub dry_run: bool,
}

/// Stages of a run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Indexing,
    ReadingPlaylist,
    CapacityCheck,
    Copying,
    Aborted,
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Indexing => "indexing destination",
            Self::ReadingPlaylist => "reading playlist",
            Self::CapacityCheck => "checking free space",
            Self::Copying => "copying",
            Self::Aborted => "aborted",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Main sync engine
pub struct SyncEngine {
    options: SyncOptions,
    extractor: Arc<dyn MetadataExtractor>,
    indexer: DestinationIndexer,
    path_builder: PathBuilder,
    conflict_resolver: ConflictResolver,
    capacity_guard: CapacityGuard,
    executor: CopyExecutor,
    free_space: Option<u64>,
}

impl SyncEngine {
    /// Create a new sync engine with options
    pub fn new(options: SyncOptions, extractor: Arc<dyn MetadataExtractor>) -> Self {
        let indexer = DestinationIndexer::new(Arc::clone(&extractor));
        let path_builder = PathBuilder::new(options.pattern.clone(), options.local_roots.clone());
        let conflict_resolver = ConflictResolver::new(options.conflict_policy);
        let executor = CopyExecutor::new(options.dry_run);

        Self {
            options,
            extractor,
            indexer,
            path_builder,
            conflict_resolver,
            capacity_guard: CapacityGuard::new(),
            executor,
            free_space: None,
        }
    }

    /// Replace the byte copier used for every track
    pub fn with_copier(mut self, copier: Arc<dyn ByteCopier>) -> Self {
        self.executor = CopyExecutor::with_copier(copier, self.options.dry_run);
        self
    }

    /// Assume `bytes` of free space instead of querying the destination filesystem
    pub fn with_free_space(mut self, bytes: u64) -> Self {
        self.free_space = Some(bytes);
        self
    }

    /// Sync every track of `playlist` into `destination`
    pub async fn run<P1: AsRef<Path>, P2: AsRef<Path>>(
        &self,
        playlist: P1,
        destination: P2,
        port: &mut dyn DecisionPort,
    ) -> Result<SyncReport> {
        let playlist_path = playlist.as_ref();
        let dest_root = destination.as_ref();
        let started = Instant::now();
        let mut report = SyncReport::new(self.options.dry_run);

        info!(
            "Syncing '{}' to '{}'{}",
            playlist_path.display(),
            dest_root.display(),
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        Self::enter(SyncPhase::Indexing);
        let index = self.prepare_destination(dest_root).await?;
        debug!("{} tracks on '{}'", index.len(), index.root().display());

        Self::enter(SyncPhase::ReadingPlaylist);
        let playlist = PlaylistSet::read(playlist_path).await?;
        report.missing = playlist.missing_count();
        report.bytes_planned = playlist.total_bytes();

        Self::enter(SyncPhase::CapacityCheck);
        let free_bytes = match self.free_space {
            Some(bytes) => bytes,
            None => CapacityGuard::free_space(&existing_ancestor(dest_root))?,
        };
        let capacity = self
            .capacity_guard
            .check(playlist.total_bytes(), free_bytes, port)?;
        if capacity == CapacityDecision::Abort {
            Self::enter(SyncPhase::Aborted);
            report.status = SyncStatus::Aborted;
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        Self::enter(SyncPhase::Copying);
        for source in playlist.entries() {
            if !self.sync_track(source, dest_root, &index, port, &mut report).await? {
                report.status = SyncStatus::Halted;
                break;
            }
        }

        Self::enter(SyncPhase::Done);
        report.elapsed = started.elapsed();
        info!(
            "Sync {}: {} transferred, {} skipped, {} failed",
            report.status,
            report.transferred(),
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    /// Process one source track; returns false when the batch must stop
    async fn sync_track(
        &self,
        source: &Path,
        dest_root: &Path,
        index: &DestinationIndex,
        port: &mut dyn DecisionPort,
        report: &mut SyncReport,
    ) -> Result<bool> {
        let track = self.extract(source).await;

        let relative = match self.path_builder.build(&track.tags, source) {
            Ok(relative) => relative,
            Err(e) => {
                warn!("Skipping '{}': {}", source.display(), e);
                report.record_failure(source, None, e);
                return Ok(true);
            }
        };
        let destination = dest_root.join(&relative);

        let decision = self
            .conflict_resolver
            .resolve(&track, &destination, index, port)?;
        let replace = match &decision {
            SyncDecision::Skip => {
                info!("Skipped '{}'", source.display());
                report.skipped += 1;
                return Ok(true);
            }
            SyncDecision::Replace { existing } => existing.as_slice(),
            SyncDecision::Copy | SyncDecision::CopyAlongside => &[],
        };

        match self.executor.copy(source, dest_root, &relative, replace).await {
            Ok(outcome) => {
                info!(
                    "{} '{}' -> '{}'",
                    if self.options.dry_run { "Would copy" } else { "Copied" },
                    source.display(),
                    outcome.relative.display()
                );
                report.bytes_copied += outcome.bytes;
                match decision {
                    SyncDecision::Replace { .. } => report.replaced += 1,
                    SyncDecision::CopyAlongside => report.copied_alongside += 1,
                    _ => report.copied += 1,
                }
                Ok(true)
            }
            Err(e @ CopyError::OutOfSpace { .. }) => {
                error!("{e}; stopping");
                report.record_failure(source, Some(destination), e);
                Ok(false)
            }
            Err(e) if e.is_fatal() => Err(SyncError::Copy(e)),
            Err(e) => {
                warn!("{e}");
                report.record_failure(source, Some(destination), e);
                Ok(true)
            }
        }
    }

    /// Index the destination, creating it first unless this is a dry run
    async fn prepare_destination(&self, dest_root: &Path) -> Result<DestinationIndex> {
        if !dest_root.exists() {
            if self.options.dry_run {
                info!("DRY RUN: would create destination '{}'", dest_root.display());
                return Ok(DestinationIndex::from_tracks(dest_root, Vec::new()));
            }
            fs::create_dir_all(dest_root).await.map_err(|e| {
                SyncError::path_error(dest_root, format!("Failed to create destination directory: {e}"))
            })?;
        }

        self.indexer.index(dest_root).await
    }

    /// Read tags off the runtime threads; failures yield an untagged track
    async fn extract(&self, source: &Path) -> Track {
        let extractor = Arc::clone(&self.extractor);
        let path = source.to_path_buf();
        let record = tokio::task::spawn_blocking(move || extractor.extract(&path)).await;

        match record {
            Ok(Ok(record)) => Track::new(source, record),
            Ok(Err(e)) => {
                warn!("{e}; treating as untagged");
                Track::untagged(source)
            }
            Err(e) => {
                warn!("Tag extraction task for '{}' failed: {}", source.display(), e);
                Track::untagged(source)
            }
        }
    }

    fn enter(phase: SyncPhase) {
        info!("Phase: {}", phase);
    }
}

/// Closest ancestor of `path` that exists, for free space queries
///
/// A relative path ends at the empty ancestor, which stands for the working
/// directory.
fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .find(|p| p.exists())
        .unwrap_or(path)
        .to_path_buf()
}

mod pattern_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::naming::NamingPattern;

    pub fn serialize<S: Serializer>(pattern: &NamingPattern, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(pattern.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NamingPattern, D::Error> {
        let text = String::deserialize(deserializer)?;
        NamingPattern::parse(&text).map_err(serde::de::Error::custom)
    }
}
