//! Per-node debounce of host change notifications.
//!
//! The host can emit many raw connectivity/label notifications while the user
//! drags a single connection. Each notification re-arms a per-node deadline on
//! a cooperative logical clock; the consolidated stabilize pass runs once the
//! node has been quiet for [`QUIET_PERIOD`] time units. Everything is
//! single-threaded: deadlines only fire when the owner pumps [`due`].
//!
//! [`due`]: StabilizationScheduler::due

use hashbrown::HashMap;
use log::trace;

use crate::types::NodeHandle;

/// Quiet period, in host time units, before a stabilize pass fires.
pub const QUIET_PERIOD: u64 = 64;

#[derive(Debug, Default)]
pub struct StabilizationScheduler {
    pending: HashMap<NodeHandle, u64>,
}

impl StabilizationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the deadline for `node`. A pending deadline is
    /// superseded, which is what coalesces notification bursts.
    pub fn schedule(&mut self, node: NodeHandle, now: u64) {
        let deadline = now + QUIET_PERIOD;
        self.pending.insert(node, deadline);
        trace!("node {node}: stabilize armed for t={deadline}");
    }

    /// Drop any pending deadline for `node`. Used by reorder (which must not
    /// let a stabilize observe a half-moved store) and by node destruction.
    pub fn cancel(&mut self, node: NodeHandle) -> bool {
        self.pending.remove(&node).is_some()
    }

    pub fn is_pending(&self, node: NodeHandle) -> bool {
        self.pending.contains_key(&node)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain every node whose deadline has passed, in handle order so firing
    /// is deterministic. Each drained node fires exactly once.
    pub fn due(&mut self, now: u64) -> Vec<NodeHandle> {
        let mut ready: Vec<NodeHandle> = self
            .pending
            .iter()
            .filter(|(_, &deadline)| deadline <= now)
            .map(|(&node, _)| node)
            .collect();
        ready.sort_unstable();
        for node in &ready {
            self.pending.remove(node);
        }
        ready
    }
}
