//! Replica set view (C1): the current up/down vector over N replicas and
//! deterministic preferred-read-replica selection.
//!
//! Selection is deterministic given `(preferred_order, up)`, which gives
//! idempotent failover: retrying after a transient view change never skips
//! a replica silently.

use crate::error::CoordinatorError;
use crate::ids::ReplicaId;

/// A point-in-time snapshot of which replicas are reachable.
///
/// Sampled once at each decision point (opendir fan-out, or a readdir
/// request); later changes are only observed on the next RPC boundary.
#[derive(Debug, Clone)]
pub struct ReplicaView {
    up: Vec<bool>,
}

impl ReplicaView {
    /// Creates a view from an explicit up/down vector, one entry per replica.
    #[must_use]
    pub fn new(up: Vec<bool>) -> Self {
        Self { up }
    }

    /// Creates a view where every replica is up.
    #[must_use]
    pub fn all_up(replica_count: usize) -> Self {
        Self {
            up: vec![true; replica_count],
        }
    }

    /// Total number of replicas this view covers.
    #[must_use]
    pub fn replica_count(&self) -> usize {
        self.up.len()
    }

    /// Number of currently-reachable replicas.
    #[must_use]
    pub fn up_count(&self) -> usize {
        self.up.iter().filter(|&&u| u).count()
    }

    /// Returns whether `replica` is currently up.
    #[must_use]
    pub fn is_up(&self, replica: ReplicaId) -> bool {
        self.up.get(replica.index()).copied().unwrap_or(false)
    }

    /// Selects the first replica in `preferred_order` that is up.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NoReplicaUp`] if none of `preferred_order`
    /// is up.
    pub fn choose_read_replica(
        &self,
        preferred_order: &[ReplicaId],
    ) -> Result<ReplicaId, CoordinatorError> {
        preferred_order
            .iter()
            .copied()
            .find(|&r| self.is_up(r))
            .ok_or(CoordinatorError::NoReplicaUp)
    }

    /// Selects the next up replica after `current` in `preferred_order`,
    /// wrapping never occurs — only replicas strictly after `current` in the
    /// order are considered, so each replica is tried at most once per
    /// failover sequence.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::FailoverExhausted`] if no later replica in
    /// the order is up.
    pub fn next_replica(
        &self,
        current: ReplicaId,
        preferred_order: &[ReplicaId],
    ) -> Result<ReplicaId, CoordinatorError> {
        let position = preferred_order.iter().position(|&r| r == current);
        let search_from = position.map_or(0, |p| p + 1);
        preferred_order[search_from..]
            .iter()
            .copied()
            .find(|&r| self.is_up(r))
            .ok_or(CoordinatorError::FailoverExhausted)
    }
}
