//! Compensating actions for partially applied link changes.
//!
//! Each kernel mutation that succeeds records its inverse here. When a later
//! step fails, [`Rollback::unwind`] runs the recorded inverses newest first.
//! Their own failures are logged and dropped so the original error is the one
//! reported.

use macvtap_network::LinkManager;

/// Inverse of a completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    /// Delete the named link in the target namespace.
    DeleteLink {
        /// Link name.
        name: String,
    },
}

/// Journal of inverse actions.
#[derive(Debug, Default)]
#[must_use]
pub struct Rollback {
    steps: Vec<Undo>,
}

impl Rollback {
    /// Create an empty journal.
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Record the inverse of a step that just succeeded.
    pub fn push(&mut self, step: Undo) {
        tracing::trace!(?step, "Recorded rollback step");
        self.steps.push(step);
    }

    /// Recorded steps, oldest first.
    #[must_use]
    pub fn steps(&self) -> &[Undo] {
        &self.steps
    }

    /// Keep every change made so far.
    pub fn commit(self) {
        tracing::trace!(steps = self.steps.len(), "Rollback committed");
    }

    /// Undo every recorded step inside `netns`, newest first.
    pub async fn unwind<M: LinkManager>(self, links: &M, netns: &M::Netns) {
        for step in self.steps.into_iter().rev() {
            match step {
                Undo::DeleteLink { name } => {
                    if let Err(err) = links.delete(Some(netns), &name).await {
                        tracing::warn!(%name, %err, "Rollback step failed");
                    } else {
                        tracing::debug!(%name, "Rolled back link");
                    }
                }
            }
        }
    }
}
