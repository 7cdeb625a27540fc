use tracksync::{CapacityChoice, CapacityPrompt, ConflictChoice, ConflictPrompt, DecisionPort, Result};

/// Runs a blocking decision port (a terminal) without stalling the runtime
///
/// Needs the multi-threaded runtime that `#[tokio::main]` starts.
pub struct BlockingPort<P> {
    inner: P,
}

impl<P: DecisionPort> BlockingPort<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<P: DecisionPort> DecisionPort for BlockingPort<P> {
    fn resolve_conflict(&mut self, prompt: &ConflictPrompt) -> Result<ConflictChoice> {
        tokio::task::block_in_place(|| self.inner.resolve_conflict(prompt))
    }

    fn confirm_capacity(&mut self, prompt: &CapacityPrompt) -> Result<CapacityChoice> {
        tokio::task::block_in_place(|| self.inner.confirm_capacity(prompt))
    }
}
