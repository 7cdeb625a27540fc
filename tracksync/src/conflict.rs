//! Detection and resolution of tracks already present at the destination

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::decision::{ConflictChoice, ConflictPrompt, DecisionPort, TrackFacts};
use crate::error::Result;
use crate::index::{DestinationIndex, TrackKey};
use crate::metadata::Track;

/// How conflicts are settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Ask the decision port for every existing match
    #[default]
    Prompt,
    /// Never ask; copy as if nothing matched (same-path files are overwritten)
    CopyAll,
    /// Never ask; leave tracks that already exist alone
    SkipAll,
}

/// What to do with one playlist track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncDecision {
    /// No equivalent track exists (or the policy ignores it)
    Copy,
    /// Remove these destination files, then copy
    Replace { existing: Vec<PathBuf> },
    /// Keep the existing files and copy next to them
    CopyAlongside,
    /// Leave the destination untouched
    Skip,
}

impl SyncDecision {
    pub fn copies(&self) -> bool {
        !matches!(self, Self::Skip)
    }
}

/// Resolves conflicts against a destination index
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    policy: ConflictPolicy,
}

impl ConflictResolver {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// Decide what to do with `track`, which would be written to `destination`
    pub fn resolve(
        &self,
        track: &Track,
        destination: &Path,
        index: &DestinationIndex,
        port: &mut dyn DecisionPort,
    ) -> Result<SyncDecision> {
        if !track.tagged {
            return Ok(SyncDecision::Copy);
        }

        let key = TrackKey::from_tags(&track.tags);
        let existing: Vec<&Path> = index.matches(&key).collect();
        if existing.is_empty() {
            return Ok(SyncDecision::Copy);
        }

        match self.policy {
            ConflictPolicy::CopyAll => {
                debug!("'{}' already exists {} time(s), copying anyway", key, existing.len());
                return Ok(SyncDecision::Copy);
            }
            ConflictPolicy::SkipAll => {
                debug!("'{}' already exists, skipping", key);
                return Ok(SyncDecision::Skip);
            }
            ConflictPolicy::Prompt => {}
        }

        let mut replaced = Vec::new();
        let mut alongside = false;

        for existing_path in existing {
            let prompt = Self::prompt_for(&key, track, existing_path, destination, index);
            let choice = port.resolve_conflict(&prompt)?;

            let choice = if prompt.offers(choice) {
                choice
            } else {
                warn!(
                    "{:?} was not offered for '{}', ignoring the track instead",
                    choice,
                    existing_path.display()
                );
                ConflictChoice::Skip
            };

            match choice {
                ConflictChoice::Replace => replaced.push(existing_path.to_path_buf()),
                ConflictChoice::CopyAlongside => alongside = true,
                ConflictChoice::Skip => {}
            }
        }

        let decision = if !replaced.is_empty() {
            SyncDecision::Replace { existing: replaced }
        } else if alongside {
            SyncDecision::CopyAlongside
        } else {
            SyncDecision::Skip
        };
        info!("Conflict on '{}' resolved as {:?}", key, decision);
        Ok(decision)
    }

    fn prompt_for(
        key: &TrackKey,
        track: &Track,
        existing_path: &Path,
        destination: &Path,
        index: &DestinationIndex,
    ) -> ConflictPrompt {
        let existing_tags = index.get(existing_path).map(|t| &t.tags);

        let mut choices = vec![ConflictChoice::Replace, ConflictChoice::Skip];
        if existing_path.file_name() != destination.file_name() {
            choices.push(ConflictChoice::CopyAlongside);
        }

        ConflictPrompt {
            key: key.clone(),
            source: TrackFacts {
                path: track.path.clone(),
                bitrate: track.tags.bitrate,
                duration: track.tags.duration,
            },
            existing: TrackFacts {
                path: existing_path.to_path_buf(),
                bitrate: existing_tags.and_then(|t| t.bitrate),
                duration: existing_tags.and_then(|t| t.duration),
            },
            destination: destination.to_path_buf(),
            choices,
        }
    }
}
