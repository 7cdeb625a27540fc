//! Shared fixtures for unit tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::MetadataError;
use crate::metadata::{MetadataExtractor, TagRecord, TrackTags};

/// Complete tags with a 128 kbps, 200 s technical profile
pub fn tags(artist: &str, album: &str, title: &str, number: &str) -> TrackTags {
    TrackTags {
        artist: Some(artist.to_string()),
        album: Some(album.to_string()),
        title: Some(title.to_string()),
        number: Some(number.to_string()),
        year: None,
        bitrate: Some(128_000),
        duration: Some(Duration::from_secs(200)),
    }
}

/// Extractor answering from a fixed table; unknown paths fail to parse
#[derive(Debug, Default, Clone)]
pub struct FakeExtractor {
    records: HashMap<PathBuf, TagRecord>,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<PathBuf>, record: TagRecord) -> Self {
        self.records.insert(path.into(), record);
        self
    }
}

impl MetadataExtractor for FakeExtractor {
    fn extract(&self, path: &Path) -> Result<TagRecord, MetadataError> {
        self.records
            .get(path)
            .cloned()
            .ok_or_else(|| MetadataError::Read {
                path: path.to_path_buf(),
                message: "no fixture".to_string(),
            })
    }
}
