//! Per-inode `opendir_done` latch.
//!
//! Monotonic, process-wide: once set, never reset, and no further
//! divergence probe runs for that inode regardless of later opens.
//!
//! The real inode table lives in the host filesystem translator and would
//! normally carry this flag as inode-attached context; this crate has no
//! access to that table, so it falls back to a process-wide concurrent set,
//! the same `DashMap`/`DashSet`-backed per-key state pattern used elsewhere
//! in this crate for the per-handle registry.

use async_trait::async_trait;
use dashmap::DashSet;

use crate::ids::InodeId;

/// Get/set access to the per-inode `opendir_done` latch.
#[async_trait]
pub trait InodeLatchStore: Send + Sync {
    /// True once the first divergence probe for `inode` has completed.
    async fn is_opendir_done(&self, inode: InodeId) -> bool;

    /// Marks `inode`'s first divergence probe as complete. Idempotent: safe
    /// to call even if already set (two concurrent opens may both finish
    /// Phase B and both call this).
    async fn set_opendir_done(&self, inode: InodeId);
}

/// Default `InodeLatchStore` backed by a concurrent set.
#[derive(Debug, Default)]
pub struct DashMapInodeLatchStore {
    done: DashSet<InodeId>,
}

impl DashMapInodeLatchStore {
    /// Creates an empty latch store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InodeLatchStore for DashMapInodeLatchStore {
    async fn is_opendir_done(&self, inode: InodeId) -> bool {
        self.done.contains(&inode)
    }

    async fn set_opendir_done(&self, inode: InodeId) {
        self.done.insert(inode);
    }
}
