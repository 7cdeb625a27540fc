//! Destination indexing: a forward map of every audio file and a reverse index by tags

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::metadata::{is_audio_file, MetadataExtractor, Track, TrackTags};

pub const UNKNOWN_ARTIST: &str = "unknown artist";
pub const UNKNOWN_ALBUM: &str = "unknown album";
pub const UNKNOWN_TITLE: &str = "unknown track";

/// Identity of a track for duplicate detection
///
/// Absent fields stay `None` so they never collide with an artist that is
/// literally called "unknown artist"; the placeholders are display-only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrackKey {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
}

impl TrackKey {
    pub fn from_tags(tags: &TrackTags) -> Self {
        Self {
            artist: tags.artist.clone(),
            album: tags.album.clone(),
            title: tags.title.clone(),
        }
    }

    pub fn artist_or_placeholder(&self) -> &str {
        self.artist.as_deref().unwrap_or(UNKNOWN_ARTIST)
    }

    pub fn album_or_placeholder(&self) -> &str {
        self.album.as_deref().unwrap_or(UNKNOWN_ALBUM)
    }

    pub fn title_or_placeholder(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({})",
            self.artist_or_placeholder(),
            self.title_or_placeholder(),
            self.album_or_placeholder()
        )
    }
}

/// Snapshot of the audio files present at the destination
///
/// Built once per run and never mutated afterwards; the reverse index is
/// derived from the forward map at construction.
#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    root: PathBuf,
    tracks: BTreeMap<PathBuf, Track>,
    by_key: BTreeMap<TrackKey, BTreeSet<PathBuf>>,
}

impl DestinationIndex {
    /// Build an index from already-extracted tracks
    pub fn from_tracks(root: impl Into<PathBuf>, tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut forward = BTreeMap::new();
        for track in tracks {
            forward.insert(track.path.clone(), track);
        }

        let mut by_key: BTreeMap<TrackKey, BTreeSet<PathBuf>> = BTreeMap::new();
        for (path, track) in &forward {
            if track.tagged {
                by_key
                    .entry(TrackKey::from_tags(&track.tags))
                    .or_default()
                    .insert(path.clone());
            }
        }

        Self {
            root: root.into(),
            tracks: forward,
            by_key,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&Track> {
        self.tracks.get(path)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Destination paths holding a track with the same key, in sorted order
    pub fn matches(&self, key: &TrackKey) -> impl Iterator<Item = &Path> {
        self.by_key
            .get(key)
            .into_iter()
            .flat_map(|paths| paths.iter().map(PathBuf::as_path))
    }

    /// Every (key, path) pair of the reverse index
    pub fn reverse_entries(&self) -> impl Iterator<Item = (&TrackKey, &Path)> {
        self.by_key
            .iter()
            .flat_map(|(key, paths)| paths.iter().map(move |p| (key, p.as_path())))
    }

    /// Number of files recorded without a tag block
    pub fn untagged_count(&self) -> usize {
        self.tracks.values().filter(|t| !t.tagged).count()
    }
}

/// Walks a destination tree and extracts tags for every audio file
pub struct DestinationIndexer {
    extractor: Arc<dyn MetadataExtractor>,
}

impl DestinationIndexer {
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { extractor }
    }

    /// Index every supported audio file below `root`
    pub async fn index<P: AsRef<Path>>(&self, root: P) -> Result<DestinationIndex> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(SyncError::path_error(&root, "Destination is not a directory"));
        }

        let extractor = Arc::clone(&self.extractor);
        let scan_root = root.clone();
        let index = tokio::task::spawn_blocking(move || Self::scan(&scan_root, extractor.as_ref()))
            .await
            .map_err(|e| SyncError::path_error(&root, format!("Indexing task failed: {e}")))?;

        info!(
            "Indexed {} audio files in '{}' ({} untagged)",
            index.len(),
            root.display(),
            index.untagged_count()
        );
        Ok(index)
    }

    fn scan(root: &Path, extractor: &dyn MetadataExtractor) -> DestinationIndex {
        let mut tracks = Vec::new();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under '{}': {}", root.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_audio_file(path) {
                continue;
            }

            let track = match extractor.extract(path) {
                Ok(record) => Track::new(path, record),
                Err(e) => {
                    warn!("{e}; indexing as untagged");
                    Track::untagged(path)
                }
            };
            debug!("Indexed '{}' (tagged: {})", path.display(), track.tagged);
            tracks.push(track);
        }

        DestinationIndex::from_tracks(root, tracks)
    }
}
