//! Self-heal trigger collaborator:
//! `trigger_self_heal(inode, flags{entry:true, forced_merge:true}, reason)`.
//!
//! The coordinator only ever *fires* this; the actual reconciliation worker
//! lives outside this crate. Errors from the trigger are logged, never
//! surfaced to the client.

use async_trait::async_trait;
use tracing::info;

use crate::ids::InodeId;

/// Flags describing the heal to request, mirroring the original source's
/// `afr_self_heal_t` fields this crate actually sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealDescriptor {
    /// Request an entry (directory-contents) self-heal.
    pub entry: bool,
    /// Force a merge of divergent directory contents rather than picking one side.
    pub forced_merge: bool,
}

impl HealDescriptor {
    /// The descriptor the divergence probe always uses on a checksum
    /// mismatch: both `entry` and `forced_merge` set.
    #[must_use]
    pub fn entry_forced_merge() -> Self {
        Self {
            entry: true,
            forced_merge: true,
        }
    }
}

/// Error from a self-heal trigger attempt. Never surfaced to the client;
/// only logged by the caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("self-heal trigger failed: {0}")]
pub struct HealError(pub String);

/// Fires a self-heal request for a directory inode.
#[async_trait]
pub trait SelfHealTrigger: Send + Sync {
    /// Requests a self-heal of `inode` with the given descriptor and reason.
    ///
    /// Implementations should treat this as fire-and-forget from the
    /// coordinator's perspective: the coordinator awaits only until the heal
    /// has been *requested*, not until it completes. Continuation after the
    /// heal finishes (unwinding the original opendir) is the coordinator's
    /// job, not this trait's.
    async fn trigger_self_heal(
        &self,
        inode: InodeId,
        descriptor: HealDescriptor,
        reason: &str,
    ) -> Result<(), HealError>;
}

/// Default trigger: logs the request and succeeds without doing anything.
///
/// Suitable when the host has not yet wired in a real self-heal worker, or
/// in tests that only assert the coordinator *requested* a heal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSelfHealTrigger;

#[async_trait]
impl SelfHealTrigger for NoopSelfHealTrigger {
    async fn trigger_self_heal(
        &self,
        inode: InodeId,
        descriptor: HealDescriptor,
        reason: &str,
    ) -> Result<(), HealError> {
        info!(
            %inode,
            entry = descriptor.entry,
            forced_merge = descriptor.forced_merge,
            %reason,
            "self-heal requested (no-op trigger)"
        );
        Ok(())
    }
}
