//! Directory handle context (C2): per-open-directory state threaded through
//! every `readdir`/`readdirp` call on a handle.

use std::collections::HashSet;

use crate::ids::ReplicaId;
use crate::types::DirEntry;

/// Sentinel for "no replica has served this handle yet".
const NO_REPLICA_TRIED: i64 = -1;

/// Per-handle state.
///
/// Created on `opendir`, mutated only by operations on its own handle, and
/// destroyed on `releasedir`.
#[derive(Debug, Default)]
pub struct HandleContext {
    /// The replica currently serving reads, or `None` initially.
    last_tried: Option<ReplicaId>,
    /// True once any failover or replica switch has occurred for this handle.
    failed_over: bool,
    /// Names previously returned to the client on this handle. Only
    /// consulted once `failed_over` is true, but kept up to date from the
    /// first read so a *future* failover can dedup against it.
    remembered: HashSet<String>,
}

impl HandleContext {
    /// Creates a fresh context: no replica tried yet, not failed over, empty
    /// remembered set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a failover or replica switch has happened on this handle.
    #[must_use]
    pub fn failed_over(&self) -> bool {
        self.failed_over
    }

    /// The replica currently serving reads, if any.
    #[must_use]
    pub fn last_tried(&self) -> Option<ReplicaId> {
        self.last_tried
    }

    /// Raw opaque sentinel form of `last_tried`, `-1` if none.
    #[must_use]
    pub fn last_tried_raw(&self) -> i64 {
        self.last_tried.map_or(NO_REPLICA_TRIED, |r| i64::from(r.0))
    }

    /// Inserts each name into `remembered`. Duplicates are no-ops.
    pub fn remember<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.remembered.insert(name.to_string());
        }
    }

    /// Returns true if `name` has already been returned to the client on
    /// this handle.
    #[must_use]
    pub fn is_remembered(&self, name: &str) -> bool {
        self.remembered.contains(name)
    }

    /// Number of names remembered so far (test/inspection helper).
    #[must_use]
    pub fn remembered_len(&self) -> usize {
        self.remembered.len()
    }

    /// Removes any entry whose name is already remembered, preserving the
    /// order of survivors. Returns `(filtered_entries, highest_offset_seen)`
    /// where the offset is the maximum opaque offset across the *input*
    /// entries (not the filtered ones), so the caller can resume past
    /// entries already seen even if they are all duplicates.
    #[must_use]
    pub fn filter(&self, entries: Vec<DirEntry>) -> (Vec<DirEntry>, i64) {
        let highest_offset = entries
            .iter()
            .map(|e| e.opaque_offset)
            .max()
            .unwrap_or(NO_REPLICA_TRIED);
        let filtered = entries
            .into_iter()
            .filter(|e| !self.is_remembered(&e.name))
            .collect();
        (filtered, highest_offset)
    }

    /// Idempotent flip of the `failed_over` flag.
    pub fn mark_failed_over(&mut self) {
        self.failed_over = true;
    }

    /// Records the currently-serving replica. If this differs from the
    /// previous non-negative value, also flips `failed_over`.
    pub fn set_last_tried(&mut self, replica: ReplicaId) {
        if let Some(previous) = self.last_tried {
            if previous != replica {
                self.mark_failed_over();
            }
        }
        self.last_tried = Some(replica);
    }
}
