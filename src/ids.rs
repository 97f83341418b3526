//! Newtype identifiers used across the coordinator.
//!
//! Replica indices, inode identities, and client-visible handles are all
//! plain integers at the wire boundary; keeping them as distinct types here
//! avoids accidentally passing one where another is expected.

use std::fmt;

/// Index of a replica (backing subvolume) in `[0, N)`, stable for the
/// lifetime of the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplicaId(pub u32);

impl ReplicaId {
    /// Returns the replica index as `usize` for indexing into per-replica vectors.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica#{}", self.0)
    }
}

impl From<usize> for ReplicaId {
    fn from(value: usize) -> Self {
        Self(u32::try_from(value).unwrap_or(u32::MAX))
    }
}

/// Opaque inode identity, used for the per-inode `opendir_done` latch and
/// for the root-directory check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InodeId(pub u64);

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inode#{}", self.0)
    }
}

/// Client-visible handle for an opened directory.
///
/// Generated by the coordinator on `opendir`; the client never constructs
/// one directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientHandle(pub u64);

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Opaque per-replica handle token returned by a replica's `open-directory`.
///
/// Never exposed to the client; only used to address subsequent `readdir`
/// RPCs to the correct replica-side directory handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplicaHandleToken(pub u64);
