//! Property tests for destination naming and indexing using proptest

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use crate::index::DestinationIndex;
use crate::metadata::{TagRecord, Track, TrackTags};
use crate::naming::{NamingPattern, PathBuilder};

/// Strategy for tag values without separators
pub fn tag_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 _.-]{0,20}[a-zA-Z0-9]"
}

/// Strategy for track numbers
pub fn track_number() -> impl Strategy<Value = String> {
    (1u32..200).prop_map(|n| n.to_string())
}

/// Strategy for complete tag sets
pub fn complete_tags() -> impl Strategy<Value = TrackTags> {
    (tag_value(), tag_value(), tag_value(), track_number()).prop_map(|(artist, album, title, number)| {
        TrackTags {
            artist: Some(artist),
            album: Some(album),
            title: Some(title),
            number: Some(number),
            ..TrackTags::default()
        }
    })
}

/// Strategy for tag sets where any field may be missing
pub fn partial_tags() -> impl Strategy<Value = TrackTags> {
    (
        prop::option::of(tag_value()),
        prop::option::of(tag_value()),
        prop::option::of(tag_value()),
        prop::option::of(track_number()),
    )
        .prop_map(|(artist, album, title, number)| TrackTags {
            artist,
            album,
            title,
            number,
            ..TrackTags::default()
        })
}

/// Strategy for relative library paths
pub fn library_path() -> impl Strategy<Value = PathBuf> {
    (prop::collection::vec("[a-zA-Z0-9_-]{1,12}", 1..4), "[a-z0-9]{1,10}").prop_map(|(dirs, stem)| {
        let mut path: PathBuf = dirs.into_iter().collect();
        path.push(format!("{stem}.mp3"));
        path
    })
}

proptest! {
    #[test]
    fn test_build_is_deterministic(tags in partial_tags(), relative in library_path()) {
        let builder = PathBuilder::new(NamingPattern::default(), vec![PathBuf::from("/music")]);
        let source = Path::new("/music").join(&relative);

        let first = builder.build(&tags, &source).unwrap();
        let second = builder.build(&tags, &source).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_complete_tags_keep_source_extension(tags in complete_tags(), ext in "(mp3|ogg|flac|m4a|wav)") {
        let builder = PathBuilder::new(NamingPattern::default(), vec![]);
        let source = PathBuf::from(format!("/anywhere/file.{ext}"));

        let path = builder.build(&tags, &source).unwrap();
        prop_assert_eq!(path.extension().map(|e| e.to_string_lossy().into_owned()), Some(ext));
        prop_assert!(path.is_relative());
        prop_assert_eq!(path.components().count(), 3);
    }

    #[test]
    fn test_distinct_complete_tags_give_distinct_paths(a in complete_tags(), b in complete_tags()) {
        let key = |t: &TrackTags| (t.artist.clone(), t.album.clone(), t.title.clone(), t.number.clone());
        prop_assume!(key(&a) != key(&b));

        let builder = PathBuilder::new(NamingPattern::default(), vec![]);
        let source = Path::new("/music/x.mp3");
        prop_assert_ne!(builder.build(&a, source).unwrap(), builder.build(&b, source).unwrap());
    }

    #[test]
    fn test_built_paths_stay_inside_destination(
        artist in "[./a ]{1,4}",
        album in "[./b ]{1,4}",
        title in "[./t ]{1,4}",
    ) {
        let tags = TrackTags {
            artist: Some(artist),
            album: Some(album),
            title: Some(title),
            number: Some("1".into()),
            ..TrackTags::default()
        };
        let builder = PathBuilder::new(NamingPattern::default(), vec![]);

        let path = builder.build(&tags, Path::new("/music/x.mp3")).unwrap();
        prop_assert!(path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_))));
    }

    #[test]
    fn test_incomplete_tags_mirror_library_layout(relative in library_path()) {
        let builder = PathBuilder::new(
            NamingPattern::default(),
            vec![PathBuf::from("/music"), PathBuf::from("/music/extra")],
        );
        let source = Path::new("/music").join(&relative);

        let path = builder.build(&TrackTags::default(), &source).unwrap();
        let expected = if relative.starts_with("extra") {
            relative.strip_prefix("extra").unwrap().to_path_buf()
        } else {
            relative.clone()
        };
        prop_assert_eq!(path, expected);
    }

    #[test]
    fn test_reverse_index_paths_are_forward_keys(
        entries in prop::collection::vec((library_path(), prop::option::of(partial_tags())), 0..20)
    ) {
        let tracks = entries.into_iter().map(|(relative, tags)| {
            let path = Path::new("/dest").join(relative);
            match tags {
                Some(tags) => Track::new(path, TagRecord::Tagged(tags)),
                None => Track::untagged(path),
            }
        });
        let index = DestinationIndex::from_tracks("/dest", tracks);

        let forward: BTreeSet<&Path> = index.tracks().map(|t| t.path.as_path()).collect();
        for (_, path) in index.reverse_entries() {
            prop_assert!(forward.contains(path));
            prop_assert!(index.get(path).map(|t| t.tagged).unwrap_or(false));
        }
    }
}
