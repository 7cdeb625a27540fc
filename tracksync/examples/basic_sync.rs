//! Basic sync example demonstrating the playlist sync engine
//!
//! Builds a small library of untagged files, writes a playlist for it and
//! syncs it into a fresh destination, naming tracks after their library
//! location.

use std::error::Error;
use tracksync::{
    sync_playlist, CapacityChoice, CapacityPrompt, ConflictChoice, ConflictPolicy, ConflictPrompt,
    FnDecisionPort, NamingPattern, SyncOptions,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Basic Playlist Sync Example");
    println!("===========================");

    // Create temporary directories for testing
    let temp_dir = tempfile::TempDir::new()?;
    let library = temp_dir.path().join("music");
    let dest_dir = temp_dir.path().join("player");

    // Files without tag blocks are named after their place in the library
    let album = library.join("Radiohead").join("OK Computer");
    tokio::fs::create_dir_all(&album).await?;
    let mut playlist = String::from("#EXTM3U\n");
    for name in ["01 airbag.mp3", "02 paranoid android.mp3", "03 subterranean.mp3"] {
        let path = album.join(name);
        tokio::fs::write(&path, b"not really audio").await?;
        playlist.push_str(&format!("file://{}\n", path.display()).replace(' ', "%20"));
    }
    let playlist_path = temp_dir.path().join("ok-computer.m3u");
    tokio::fs::write(&playlist_path, playlist).await?;

    println!("Library: {}", library.display());
    println!("Destination: {}", dest_dir.display());
    println!();

    let options = SyncOptions {
        pattern: NamingPattern::parse("%a/%b/%n - %t")?,
        local_roots: vec![library.clone()],
        conflict_policy: ConflictPolicy::SkipAll,
        dry_run: false,
    };

    // Keep what is already there and copy until the device is full
    let mut port = FnDecisionPort::new(
        |_: &ConflictPrompt| ConflictChoice::Skip,
        |_: &CapacityPrompt| CapacityChoice::ContinueUntilFull,
    );

    let report = sync_playlist(&playlist_path, &dest_dir, options, &mut port).await?;
    println!("{}", report.summary());

    for entry in walkdir::WalkDir::new(&dest_dir).into_iter().flatten() {
        if entry.file_type().is_file() {
            println!("  {}", entry.path().strip_prefix(&dest_dir)?.display());
        }
    }

    Ok(())
}
