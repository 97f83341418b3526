//! RPC surface the coordinator dispatches to each replica.
//!
//! This is the collaborator boundary for `open-directory(loc, handle) ->
//! status` and `readdir(handle, chunk_size, offset) -> (status, entries)`:
//! the actual wire transport, retry-at-the-transport-level, and connection
//! pooling all live on the host side of this trait. Object-safe async
//! collaborator trait, reached through `dyn Trait` so the coordinator never
//! depends on a concrete transport.

use async_trait::async_trait;

use crate::error::ReplicaError;
use crate::ids::{ReplicaHandleToken, ReplicaId};
use crate::types::{DirEntry, DirLocation};

/// Per-replica directory RPCs.
#[async_trait]
pub trait ReplicaClient: Send + Sync {
    /// Opens `loc` on `replica`, returning an opaque per-replica handle
    /// token to use for subsequent `readdir` calls.
    async fn open_directory(
        &self,
        replica: ReplicaId,
        loc: &DirLocation,
    ) -> Result<ReplicaHandleToken, ReplicaError>;

    /// Reads up to `chunk_size` entries from `replica` starting at `offset`,
    /// using the handle token returned by [`Self::open_directory`].
    ///
    /// A successful reply with an empty `Vec` means end-of-stream for that
    /// replica's directory.
    async fn readdir(
        &self,
        replica: ReplicaId,
        handle: ReplicaHandleToken,
        chunk_size: u32,
        offset: i64,
        with_attrs: bool,
    ) -> Result<Vec<DirEntry>, ReplicaError>;
}
