//! Tag extraction behind the `MetadataExtractor` trait, with a `lofty` backed implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MetadataError;

/// Audio containers recognized at the destination and accepted from playlists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerFormat {
    Mp3,
    Ogg,
    Flac,
    Wma,
    M4a,
    Wav,
}

impl ContainerFormat {
    pub const ALL: [ContainerFormat; 6] = [
        Self::Mp3,
        Self::Ogg,
        Self::Flac,
        Self::Wma,
        Self::M4a,
        Self::Wav,
    ];

    /// Canonical lowercase extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::Wma => "wma",
            Self::M4a => "m4a",
            Self::Wav => "wav",
        }
    }

    /// Classify a path by its extension, case-insensitively
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|format| format.extension() == ext)
    }

    /// The lofty parser for this container, if lofty can read it
    fn lofty_file_type(self) -> Option<FileType> {
        match self {
            Self::Mp3 => Some(FileType::Mpeg),
            Self::Ogg => Some(FileType::Vorbis),
            Self::Flac => Some(FileType::Flac),
            Self::M4a => Some(FileType::Mp4),
            Self::Wav => Some(FileType::Wav),
            Self::Wma => None,
        }
    }
}

/// Whether a path looks like a supported audio file
pub fn is_audio_file(path: &Path) -> bool {
    ContainerFormat::from_path(path).is_some()
}

/// Normalized tag record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub number: Option<String>,
    pub year: Option<String>,
    /// Bits per second
    pub bitrate: Option<u32>,
    pub duration: Option<Duration>,
}

impl TrackTags {
    /// A record carrying only technical properties
    pub fn technical(bitrate: Option<u32>, duration: Option<Duration>) -> Self {
        Self {
            bitrate,
            duration,
            ..Self::default()
        }
    }

    /// True when artist, album, title and number are all present
    pub fn has_primary_fields(&self) -> bool {
        self.artist.is_some() && self.album.is_some() && self.title.is_some() && self.number.is_some()
    }
}

/// Outcome of reading one file's tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRecord {
    Tagged(TrackTags),
    NoTags {
        bitrate: Option<u32>,
        duration: Option<Duration>,
    },
}

impl TagRecord {
    pub fn is_tagged(&self) -> bool {
        matches!(self, Self::Tagged(_))
    }

    pub fn into_tags(self) -> TrackTags {
        match self {
            Self::Tagged(tags) => tags,
            Self::NoTags { bitrate, duration } => TrackTags::technical(bitrate, duration),
        }
    }
}

/// A file path bound to its tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub path: PathBuf,
    pub tags: TrackTags,
    /// False when the file carried no tag block at all
    pub tagged: bool,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>, record: TagRecord) -> Self {
        let tagged = record.is_tagged();
        Self {
            path: path.into(),
            tags: record.into_tags(),
            tagged,
        }
    }

    pub fn untagged(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tags: TrackTags::default(),
            tagged: false,
        }
    }
}

/// Source of normalized tags for a file
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<TagRecord, MetadataError>;
}

/// Extractor reading tags with `lofty`, dispatched on `ContainerFormat`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyExtractor;

impl LoftyExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Trim text values, treating blank ones as absent
    fn normalize_text(text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

impl MetadataExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> Result<TagRecord, MetadataError> {
        let unsupported = || MetadataError::UnsupportedFormat {
            path: path.to_path_buf(),
        };
        let file_type = ContainerFormat::from_path(path)
            .and_then(ContainerFormat::lofty_file_type)
            .ok_or_else(unsupported)?;

        let read_error = |e: lofty::error::LoftyError| MetadataError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let tagged_file = Probe::open(path)
            .map_err(read_error)?
            .set_file_type(file_type)
            .read()
            .map_err(read_error)?;

        let properties = tagged_file.properties();
        let bitrate = properties.audio_bitrate().map(|kbps| kbps * 1000);
        let duration = Some(properties.duration());

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            debug!("No tag block in '{}'", path.display());
            return Ok(TagRecord::NoTags { bitrate, duration });
        };

        let year = tag
            .year()
            .map(|y| y.to_string())
            .or_else(|| tag.get_string(&ItemKey::RecordingDate).and_then(Self::normalize_text));

        Ok(TagRecord::Tagged(TrackTags {
            artist: tag.artist().and_then(|s| Self::normalize_text(&s)),
            album: tag.album().and_then(|s| Self::normalize_text(&s)),
            title: tag.title().and_then(|s| Self::normalize_text(&s)),
            number: tag.track().map(|n| n.to_string()),
            year,
            bitrate,
            duration,
        }))
    }
}
