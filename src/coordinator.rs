//! Public client-facing facade: `opendir`/`readdir`/`readdirp`/`releasedir`.
//!
//! Per-handle state lives behind a [`DashMap`] keyed by [`ClientHandle`],
//! each entry an `Arc<Mutex<...>>` so a lookup never holds the map's shard
//! lock across an `.await` — the same per-key `DashMap<K, Arc<State>>`
//! pattern used for per-domain rate-limit state, where a key's `Arc` is
//! cloned out of the map and the shard lock dropped before the inner lock
//! is awaited.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::CoordinatorError;
use crate::handle::HandleContext;
use crate::heal::SelfHealTrigger;
use crate::ids::{ClientHandle, InodeId, ReplicaHandleToken, ReplicaId};
use crate::inode_latch::InodeLatchStore;
use crate::opendir::{self, OpenFanoutResult};
use crate::readdir::{self, ReplicaHandle};
use crate::replica::{ReadChildPolicy, ReplicaClient, ReplicaView};
use crate::types::{DirLocation, ReadOp};

/// Everything needed to serve `readdir`/`readdirp`/`releasedir` on a
/// previously opened directory.
struct DirHandleState {
    inode: InodeId,
    opens: Vec<ReplicaHandle>,
    context: AsyncMutex<HandleContext>,
}

/// Directory-read coordinator: fans out `opendir`, probes for divergence on
/// first open, and serves `readdir`/`readdirp` with failover.
///
/// Generic over the four external collaborators so a caller can plug in real
/// transport/heal/latch/policy implementations, or the crate's in-memory
/// defaults, without the coordinator depending on any concrete transport.
pub struct DirReadCoordinator<C, P, H, L>
where
    C: ReplicaClient,
    P: ReadChildPolicy,
    H: SelfHealTrigger,
    L: InodeLatchStore,
{
    client: C,
    policy: P,
    heal: H,
    latch: L,
    config: Config,
    replica_count: usize,
    handles: DashMap<ClientHandle, Arc<DirHandleState>>,
    next_handle_id: AtomicU64,
}

impl<C, P, H, L> DirReadCoordinator<C, P, H, L>
where
    C: ReplicaClient,
    P: ReadChildPolicy,
    H: SelfHealTrigger,
    L: InodeLatchStore,
{
    /// Creates a coordinator over `replica_count` replicas.
    pub fn new(client: C, policy: P, heal: H, latch: L, config: Config, replica_count: usize) -> Self {
        Self {
            client,
            policy,
            heal,
            latch,
            config,
            replica_count,
            handles: DashMap::new(),
            next_handle_id: AtomicU64::new(0),
        }
    }

    /// Opens `loc` (whose inode is `inode`) on every up replica in `view`.
    ///
    /// Runs the first-open divergence probe (C4 Phase B) when the inode's
    /// latch is unset and more than one replica is up; a detected divergence
    /// fires the self-heal collaborator but never prevents the handle from
    /// being returned, as long as at least one replica opened.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::NoReplicaUp`] if every replica's open failed.
    #[instrument(skip(self, view, loc))]
    pub async fn opendir(
        &self,
        loc: &DirLocation,
        inode: InodeId,
        view: &ReplicaView,
    ) -> Result<ClientHandle, CoordinatorError> {
        let fanout: OpenFanoutResult = opendir::open_fanout(&self.client, view, loc).await;
        if !fanout.any_opened() {
            return Err(CoordinatorError::NoReplicaUp);
        }

        let opendir_done = self.latch.is_opendir_done(inode).await;
        if opendir::should_run_probe(opendir_done, view) {
            let outcome =
                opendir::run_divergence_probe(&self.client, view, &fanout.opens, self.config.probe_chunk_size)
                    .await;
            if outcome.diverged {
                opendir::trigger_heal_for_divergence(&self.heal, inode).await;
            }
            self.latch.set_opendir_done(inode).await;
        }

        let opens = fanout
            .opens
            .into_iter()
            .map(|(replica, token)| ReplicaHandle { replica, token })
            .collect();

        let handle = self.allocate_handle();
        let state = Arc::new(DirHandleState {
            inode,
            opens,
            context: AsyncMutex::new(HandleContext::new()),
        });
        self.handles.insert(handle, state);
        info!(%handle, %inode, "directory opened");
        Ok(handle)
    }

    /// Serves one `readdir` call on an open handle.
    pub async fn readdir(
        &self,
        handle: ClientHandle,
        view: &ReplicaView,
        size: u32,
        offset: i64,
    ) -> Result<Vec<crate::types::DirEntry>, CoordinatorError> {
        self.readdir_op(handle, view, size, offset, ReadOp::ReadDir).await
    }

    /// Serves one `readdirp` call (same as [`Self::readdir`], plus per-entry
    /// attributes) on an open handle.
    pub async fn readdirp(
        &self,
        handle: ClientHandle,
        view: &ReplicaView,
        size: u32,
        offset: i64,
    ) -> Result<Vec<crate::types::DirEntry>, CoordinatorError> {
        self.readdir_op(handle, view, size, offset, ReadOp::ReadDirP).await
    }

    async fn readdir_op(
        &self,
        handle: ClientHandle,
        view: &ReplicaView,
        size: u32,
        offset: i64,
        op: ReadOp,
    ) -> Result<Vec<crate::types::DirEntry>, CoordinatorError> {
        let state = self
            .handles
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(CoordinatorError::ContextMissing { handle })?;

        let preferred_order = self.policy.preferred_order(self.replica_count);
        let is_root = self.config.is_root(state.inode);

        let mut context = state.context.lock().await;
        let result = readdir::serve_readdir(
            &self.client,
            view,
            &self.config,
            &mut context,
            &state.opens,
            &preferred_order,
            op,
            size,
            offset,
            is_root,
        )
        .await?;
        Ok(result.entries)
    }

    /// Releases a directory handle, freeing its remembered-names set and
    /// per-handle context. Idempotent (R2): releasing an already-released or
    /// never-opened handle is a no-op rather than an error.
    pub fn releasedir(&self, handle: ClientHandle) {
        self.handles.remove(&handle);
    }

    fn allocate_handle(&self) -> ClientHandle {
        ClientHandle(self.next_handle_id.fetch_add(1, Ordering::Relaxed))
    }
}
