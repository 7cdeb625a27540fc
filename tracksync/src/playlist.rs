//! Playlist reading: a deduplicated set of source paths and their total size

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::format::human_bytes;

const FILE_SCHEME: &str = "file://";

/// Decode one playlist entry into a filesystem path
///
/// Strips an optional `file://` prefix, then percent-decodes the remainder.
/// Bytes that are not valid UTF-8 after decoding are replaced lossily.
pub fn decode_entry(entry: &str) -> PathBuf {
    let raw = entry.strip_prefix(FILE_SCHEME).unwrap_or(entry);
    let bytes = urlencoding::decode_binary(raw.as_bytes());
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Distinct decoded paths named by playlist text
///
/// Lines are right-trimmed; blank lines and `#` comments are dropped.
/// Duplicates are removed on the raw line before decoding.
pub fn parse_lines(text: &str) -> BTreeSet<PathBuf> {
    let raw: BTreeSet<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    raw.into_iter().map(decode_entry).collect()
}

/// Source files named by a playlist
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaylistSet {
    entries: BTreeSet<PathBuf>,
    missing: BTreeSet<PathBuf>,
    total_bytes: u64,
}

impl PlaylistSet {
    /// Read and size every entry of the playlist at `path`
    pub async fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .await
            .map_err(|e| SyncError::playlist_error(path, format!("Failed to read playlist: {e}")))?;
        let text = String::from_utf8_lossy(&bytes);

        let set = Self::resolve(parse_lines(&text)).await;
        info!(
            "Playlist '{}': {}/{} files, {}",
            path.display(),
            set.entries.len(),
            set.total(),
            human_bytes(set.total_bytes)
        );
        Ok(set)
    }

    /// Split decoded paths into existing files and missing ones
    pub async fn resolve(paths: BTreeSet<PathBuf>) -> Self {
        let mut set = Self::default();

        for path in paths {
            match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => {
                    set.total_bytes += metadata.len();
                    set.entries.insert(path);
                }
                Ok(_) => {
                    warn!("Playlist entry '{}' is not a regular file", path.display());
                    set.missing.insert(path);
                }
                Err(e) => {
                    warn!("Playlist entry '{}' is missing: {}", path.display(), e);
                    set.missing.insert(path);
                }
            }
        }

        set
    }

    /// Existing source files, in lexicographic order
    pub fn entries(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    pub fn missing(&self) -> impl Iterator<Item = &Path> {
        self.missing.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Distinct entries named by the playlist, found or not
    pub fn total(&self) -> usize {
        self.entries.len() + self.missing.len()
    }

    /// Byte total of the existing entries
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// `"found/total files: bytes (human)"`
    pub fn size_summary(&self) -> String {
        format!(
            "{}/{} files: {} ({})",
            self.entries.len(),
            self.total(),
            self.total_bytes,
            human_bytes(self.total_bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;
    use test_case::test_case;

    #[test_case("/music/a.mp3", "/music/a.mp3")]
    #[test_case("file:///music/a%20b.mp3", "/music/a b.mp3")]
    #[test_case("/music/%C3%A9t%C3%A9.flac", "/music/été.flac")]
    #[test_case("/music/100%25.mp3", "/music/100%.mp3")]
    fn test_decode_entry(entry: &str, expected: &str) {
        assert_eq!(decode_entry(entry), PathBuf::from(expected));
    }

    #[test]
    fn test_invalid_utf8_decodes_lossily() {
        assert_eq!(decode_entry("/music/%FF.mp3"), PathBuf::from("/music/\u{FFFD}.mp3"));
    }

    #[test]
    fn test_parse_lines_skips_comments_and_duplicates() {
        let text = "#EXTM3U\n\
                    #EXTINF:123,Muse - Bliss\n\
                    file:///music/bliss.mp3\n\
                    /music/hysteria.mp3   \n\
                    \n\
                    file:///music/bliss.mp3\n";

        let paths = parse_lines(text);
        assert_eq!(
            paths.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/music/bliss.mp3"), PathBuf::from("/music/hysteria.mp3")]
        );
    }

    #[tokio::test]
    async fn test_read_counts_missing_and_sizes() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("A.mp3");
        let b = temp_dir.path().join("B.mp3");
        std::fs::write(&a, vec![0u8; 100]).unwrap();
        std::fs::write(&b, vec![0u8; 50]).unwrap();

        let playlist = temp_dir.path().join("list.m3u");
        std::fs::write(
            &playlist,
            format!(
                "{}\n{}\n{}\n",
                a.display(),
                b.display(),
                temp_dir.path().join("gone.mp3").display()
            ),
        )
        .unwrap();

        let set = PlaylistSet::read(&playlist).await.unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.missing_count(), 1);
        assert_eq!(set.total_bytes(), 150);
        assert_eq!(set.size_summary(), "2/3 files: 150 (150 B)");
        assert_eq!(set.entries().collect::<Vec<_>>(), vec![a.as_path(), b.as_path()]);
        let gone = temp_dir.path().join("gone.mp3");
        assert_eq!(set.missing().collect::<Vec<_>>(), vec![gone.as_path()]);
    }

    #[tokio::test]
    async fn test_read_missing_playlist_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = PlaylistSet::read(temp_dir.path().join("none.m3u")).await;
        assert!(matches!(result, Err(SyncError::Playlist { .. })));
    }

    proptest! {
        #[test]
        fn test_repeated_lines_collapse(lines in prop::collection::vec("/[a-z]{1,6}/[a-z]{1,6}\\.mp3", 1..20)) {
            let mut doubled = lines.clone();
            doubled.extend(lines.iter().cloned());

            let once = parse_lines(&lines.join("\n"));
            let twice = parse_lines(&doubled.join("\n"));
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.len() <= lines.len());
        }

        #[test]
        fn test_decoding_is_identity_without_percent(path in "/[a-zA-Z0-9 _.-]{1,30}") {
            prop_assert_eq!(decode_entry(&path), PathBuf::from(&path));
            let decoded = decode_entry(&path);
            prop_assert_eq!(decode_entry(&decoded.to_string_lossy()), decoded);
        }
    }
}
