//! Per-run counters and final status

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::format::{human_bytes, thousands};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Every playlist track was processed
    #[default]
    Completed,
    /// The operator aborted at the capacity check; nothing was copied
    Aborted,
    /// The destination filled up; the remaining tracks were not processed
    Halted,
}

impl SyncStatus {
    /// Process exit status for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Completed => 0,
            Self::Halted => 2,
            Self::Aborted => 3,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Halted => "halted",
        };
        f.write_str(name)
    }
}

/// A track that could not be synced while the run went on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackFailure {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub reason: String,
}

/// Summary of one sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub status: SyncStatus,
    /// Tracks copied where nothing equivalent existed
    pub copied: usize,
    /// Tracks copied after removing existing equivalents
    pub replaced: usize,
    /// Tracks copied next to existing equivalents
    pub copied_alongside: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Playlist entries not found on disk
    pub missing: usize,
    pub bytes_copied: u64,
    /// Bytes the playlist would transfer
    pub bytes_planned: u64,
    pub failures: Vec<TrackFailure>,
    pub dry_run: bool,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Tracks whose bytes reached the destination
    pub fn transferred(&self) -> usize {
        self.copied + self.replaced + self.copied_alongside
    }

    pub fn record_failure(
        &mut self,
        source: impl Into<PathBuf>,
        destination: Option<PathBuf>,
        reason: impl fmt::Display,
    ) {
        self.failed += 1;
        self.failures.push(TrackFailure {
            source: source.into(),
            destination,
            reason: reason.to_string(),
        });
    }

    pub fn is_successful(&self) -> bool {
        self.status == SyncStatus::Completed && self.failed == 0
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// Multi-line summary for the terminal
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Sync {}{}: {} transferred ({} copied, {} replaced, {} alongside), {} skipped, {} failed, {} missing",
            self.status,
            if self.dry_run { " (dry run)" } else { "" },
            thousands(self.transferred() as u64),
            thousands(self.copied as u64),
            thousands(self.replaced as u64),
            thousands(self.copied_alongside as u64),
            thousands(self.skipped as u64),
            thousands(self.failed as u64),
            thousands(self.missing as u64),
        )];
        lines.push(format!(
            "{} of {} copied in {:.1}s",
            human_bytes(self.bytes_copied),
            human_bytes(self.bytes_planned),
            self.elapsed.as_secs_f64()
        ));
        for failure in &self.failures {
            match &failure.destination {
                Some(destination) => lines.push(format!(
                    "  failed: {} -> {}: {}",
                    failure.source.display(),
                    destination.display(),
                    failure.reason
                )),
                None => lines.push(format!("  failed: {}: {}", failure.source.display(), failure.reason)),
            }
        }
        lines.join("\n")
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}
