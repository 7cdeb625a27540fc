//! Free space precondition before copying starts

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::decision::{CapacityChoice, CapacityPrompt, DecisionPort};
use crate::error::{Result, SyncError};
use crate::format::human_bytes;

/// Outcome of the capacity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapacityDecision {
    /// Everything fits
    Proceed,
    /// It does not fit, but the operator wants to copy until the device is full
    ContinueUntilFull,
    /// It does not fit and the operator gave up
    Abort,
}

impl CapacityDecision {
    pub fn should_copy(self) -> bool {
        !matches!(self, Self::Abort)
    }
}

/// Compares the transfer size with the destination's free space
#[derive(Debug, Default, Clone, Copy)]
pub struct CapacityGuard;

impl CapacityGuard {
    pub fn new() -> Self {
        Self
    }

    /// Free space of the filesystem holding `path`
    pub fn free_space(path: &Path) -> Result<u64> {
        fs2::free_space(path)
            .map_err(|e| SyncError::path_error(path, format!("Failed to query free space: {e}")))
    }

    pub fn check(
        &self,
        transfer_bytes: u64,
        free_bytes: u64,
        port: &mut dyn DecisionPort,
    ) -> Result<CapacityDecision> {
        if transfer_bytes < free_bytes {
            info!(
                "{} to transfer, {} free",
                human_bytes(transfer_bytes),
                human_bytes(free_bytes)
            );
            return Ok(CapacityDecision::Proceed);
        }

        warn!(
            "{} to transfer exceeds free space of {}",
            human_bytes(transfer_bytes),
            human_bytes(free_bytes)
        );
        let prompt = CapacityPrompt {
            transfer_bytes,
            free_bytes,
        };
        Ok(match port.confirm_capacity(&prompt)? {
            CapacityChoice::Abort => CapacityDecision::Abort,
            CapacityChoice::ContinueUntilFull => CapacityDecision::ContinueUntilFull,
        })
    }
}
